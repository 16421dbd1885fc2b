//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to `GatewayError` from `strata_core::storage`.

use std::fmt::Debug;

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::batch_get_item::BatchGetItemError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_sdk_dynamodb::operation::transact_get_items::TransactGetItemsError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::CancellationReason;

use strata_core::storage::{parse_cancellation_reasons, GatewayError, REASON_NONE};

fn throughput_exceeded() -> GatewayError {
    GatewayError::Throttled("Throughput exceeded, please retry".to_string())
}

fn request_limit_exceeded() -> GatewayError {
    GatewayError::Throttled("Request limit exceeded, please retry".to_string())
}

fn internal_server_error() -> GatewayError {
    GatewayError::Backend("DynamoDB internal server error".to_string())
}

/// Transport failures never reach the service; map them before
/// unwrapping the service error.
fn transport_error<E, R>(err: &SdkError<E, R>) -> Option<GatewayError> {
    match err {
        SdkError::DispatchFailure(failure) => {
            Some(GatewayError::ConnectionFailed(format!("{:?}", failure)))
        }
        SdkError::TimeoutError(_) => Some(GatewayError::ConnectionFailed(
            "Request timed out".to_string(),
        )),
        _ => None,
    }
}

/// Map a GetItem SDK error to GatewayError.
pub fn map_get_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<GetItemError, R>,
) -> GatewayError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        GetItemError::ResourceNotFoundException(e) => {
            GatewayError::ResourceNotFound(e.message().unwrap_or("table").to_string())
        }
        GetItemError::ProvisionedThroughputExceededException(_) => throughput_exceeded(),
        GetItemError::RequestLimitExceeded(_) => request_limit_exceeded(),
        GetItemError::InternalServerError(_) => internal_server_error(),
        err => GatewayError::Backend(format!("GetItem failed: {:?}", err)),
    }
}

/// Map a PutItem SDK error to GatewayError.
pub fn map_put_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<PutItemError, R>,
) -> GatewayError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        PutItemError::ConditionalCheckFailedException(_) => GatewayError::ConditionalCheckFailed,
        PutItemError::ResourceNotFoundException(e) => {
            GatewayError::ResourceNotFound(e.message().unwrap_or("table").to_string())
        }
        PutItemError::ProvisionedThroughputExceededException(_) => throughput_exceeded(),
        PutItemError::RequestLimitExceeded(_) => request_limit_exceeded(),
        PutItemError::ItemCollectionSizeLimitExceededException(_) => {
            GatewayError::Backend("Item collection size limit exceeded".to_string())
        }
        PutItemError::TransactionConflictException(_) => {
            GatewayError::Throttled("Transaction conflict, please retry".to_string())
        }
        PutItemError::InternalServerError(_) => internal_server_error(),
        err => GatewayError::Backend(format!("PutItem failed: {:?}", err)),
    }
}

/// Map an UpdateItem SDK error to GatewayError.
pub fn map_update_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<UpdateItemError, R>,
) -> GatewayError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        UpdateItemError::ConditionalCheckFailedException(_) => {
            GatewayError::ConditionalCheckFailed
        }
        UpdateItemError::ResourceNotFoundException(e) => {
            GatewayError::ResourceNotFound(e.message().unwrap_or("table").to_string())
        }
        UpdateItemError::ProvisionedThroughputExceededException(_) => throughput_exceeded(),
        UpdateItemError::RequestLimitExceeded(_) => request_limit_exceeded(),
        UpdateItemError::ItemCollectionSizeLimitExceededException(_) => {
            GatewayError::Backend("Item collection size limit exceeded".to_string())
        }
        UpdateItemError::TransactionConflictException(_) => {
            GatewayError::Throttled("Transaction conflict, please retry".to_string())
        }
        UpdateItemError::InternalServerError(_) => internal_server_error(),
        err => GatewayError::Backend(format!("UpdateItem failed: {:?}", err)),
    }
}

/// Map a DeleteItem SDK error to GatewayError.
pub fn map_delete_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DeleteItemError, R>,
) -> GatewayError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        DeleteItemError::ConditionalCheckFailedException(_) => {
            GatewayError::ConditionalCheckFailed
        }
        DeleteItemError::ResourceNotFoundException(e) => {
            GatewayError::ResourceNotFound(e.message().unwrap_or("table").to_string())
        }
        DeleteItemError::ProvisionedThroughputExceededException(_) => throughput_exceeded(),
        DeleteItemError::RequestLimitExceeded(_) => request_limit_exceeded(),
        DeleteItemError::TransactionConflictException(_) => {
            GatewayError::Throttled("Transaction conflict, please retry".to_string())
        }
        DeleteItemError::InternalServerError(_) => internal_server_error(),
        err => GatewayError::Backend(format!("DeleteItem failed: {:?}", err)),
    }
}

/// Map a Query SDK error to GatewayError.
pub fn map_query_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<QueryError, R>,
) -> GatewayError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        QueryError::ResourceNotFoundException(e) => {
            GatewayError::ResourceNotFound(e.message().unwrap_or("table or index").to_string())
        }
        QueryError::ProvisionedThroughputExceededException(_) => throughput_exceeded(),
        QueryError::RequestLimitExceeded(_) => request_limit_exceeded(),
        QueryError::InternalServerError(_) => internal_server_error(),
        err => GatewayError::Backend(format!("Query failed: {:?}", err)),
    }
}

/// Map a Scan SDK error to GatewayError.
pub fn map_scan_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<ScanError, R>,
) -> GatewayError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        ScanError::ResourceNotFoundException(e) => {
            GatewayError::ResourceNotFound(e.message().unwrap_or("table or index").to_string())
        }
        ScanError::ProvisionedThroughputExceededException(_) => throughput_exceeded(),
        ScanError::RequestLimitExceeded(_) => request_limit_exceeded(),
        ScanError::InternalServerError(_) => internal_server_error(),
        err => GatewayError::Backend(format!("Scan failed: {:?}", err)),
    }
}

/// Map a BatchGetItem SDK error to GatewayError.
pub fn map_batch_get_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<BatchGetItemError, R>,
) -> GatewayError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        BatchGetItemError::ResourceNotFoundException(e) => {
            GatewayError::ResourceNotFound(e.message().unwrap_or("table").to_string())
        }
        BatchGetItemError::ProvisionedThroughputExceededException(_) => throughput_exceeded(),
        BatchGetItemError::RequestLimitExceeded(_) => request_limit_exceeded(),
        BatchGetItemError::InternalServerError(_) => internal_server_error(),
        err => GatewayError::Backend(format!("BatchGetItem failed: {:?}", err)),
    }
}

/// Map a TransactWriteItems SDK error to GatewayError.
///
/// Cancellations keep one reason code per submitted item.
pub fn map_transact_write_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<TransactWriteItemsError, R>,
) -> GatewayError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        TransactWriteItemsError::TransactionCanceledException(e) => {
            GatewayError::TransactionCanceled {
                reasons: cancellation_reasons(e.cancellation_reasons(), e.message()),
            }
        }
        TransactWriteItemsError::TransactionInProgressException(_) => {
            GatewayError::Throttled("Transaction in progress, please retry".to_string())
        }
        TransactWriteItemsError::ResourceNotFoundException(e) => {
            GatewayError::ResourceNotFound(e.message().unwrap_or("table").to_string())
        }
        TransactWriteItemsError::ProvisionedThroughputExceededException(_) => {
            throughput_exceeded()
        }
        TransactWriteItemsError::RequestLimitExceeded(_) => request_limit_exceeded(),
        TransactWriteItemsError::InternalServerError(_) => internal_server_error(),
        err => GatewayError::Backend(format!("TransactWriteItems failed: {:?}", err)),
    }
}

/// Map a TransactGetItems SDK error to GatewayError.
pub fn map_transact_get_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<TransactGetItemsError, R>,
) -> GatewayError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        TransactGetItemsError::TransactionCanceledException(e) => {
            GatewayError::TransactionCanceled {
                reasons: cancellation_reasons(e.cancellation_reasons(), e.message()),
            }
        }
        TransactGetItemsError::ResourceNotFoundException(e) => {
            GatewayError::ResourceNotFound(e.message().unwrap_or("table").to_string())
        }
        TransactGetItemsError::ProvisionedThroughputExceededException(_) => {
            throughput_exceeded()
        }
        TransactGetItemsError::RequestLimitExceeded(_) => request_limit_exceeded(),
        TransactGetItemsError::InternalServerError(_) => internal_server_error(),
        err => GatewayError::Backend(format!("TransactGetItems failed: {:?}", err)),
    }
}

/// Per-item reason codes of a canceled transaction.
///
/// Structured reasons win; otherwise the bracketed list embedded in the
/// exception message is parsed.
pub fn cancellation_reasons(
    reasons: &[CancellationReason],
    message: Option<&str>,
) -> Vec<String> {
    if !reasons.is_empty() {
        return reasons
            .iter()
            .map(|r| r.code().unwrap_or(REASON_NONE).to_string())
            .collect();
    }
    message.map(parse_cancellation_reasons).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_reasons_win() {
        let reasons = vec![
            CancellationReason::builder().code("None").build(),
            CancellationReason::builder()
                .code("ConditionalCheckFailed")
                .build(),
        ];

        assert_eq!(
            cancellation_reasons(&reasons, Some("reasons [Foo]")),
            vec!["None".to_string(), "ConditionalCheckFailed".to_string()]
        );
    }

    #[test]
    fn test_reasons_fall_back_to_message() {
        let message = "Transaction cancelled, please refer cancellation reasons for specific \
                       reasons [None, None, ConditionalCheckFailed]";

        assert_eq!(
            cancellation_reasons(&[], Some(message)),
            vec!["None", "None", "ConditionalCheckFailed"]
        );
        assert!(cancellation_reasons(&[], None).is_empty());
    }
}
