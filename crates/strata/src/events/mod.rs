mod memory;

pub use memory::MemoryEventBus;
