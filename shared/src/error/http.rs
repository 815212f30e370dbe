//! HTTP status for each error code

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        use ErrorCode::*;
        match self {
            Success => StatusCode::OK,
            CartItemNotFound | OrderNotFound | ProductNotFound | VariantNotFound => {
                StatusCode::NOT_FOUND
            }
            AlreadyExists | EmailAlreadyRegistered | ProductSlugExists => StatusCode::CONFLICT,
            NotAuthenticated | InvalidCredentials | TokenExpired | TokenInvalid
            | SessionRequired | AccountDisabled | WebhookSignatureInvalid => {
                StatusCode::UNAUTHORIZED
            }
            AdminRequired | RegistrationRoleNotAllowed => StatusCode::FORBIDDEN,
            TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            // upstream provider failed, not us
            PaymentProviderError => StatusCode::BAD_GATEWAY,
            InternalError | DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            // validation, stock and order-state failures
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(codes: &[ErrorCode], expected: StatusCode) {
        for code in codes {
            assert_eq!(code.http_status(), expected, "{code:?}");
        }
    }

    #[test]
    fn test_missing_resources_are_404() {
        status_of(
            &[
                ErrorCode::OrderNotFound,
                ErrorCode::ProductNotFound,
                ErrorCode::VariantNotFound,
                ErrorCode::CartItemNotFound,
            ],
            StatusCode::NOT_FOUND,
        );
    }

    #[test]
    fn test_auth_failures_are_401_or_403() {
        status_of(
            &[
                ErrorCode::NotAuthenticated,
                ErrorCode::TokenExpired,
                ErrorCode::SessionRequired,
                ErrorCode::WebhookSignatureInvalid,
            ],
            StatusCode::UNAUTHORIZED,
        );
        status_of(
            &[ErrorCode::AdminRequired, ErrorCode::RegistrationRoleNotAllowed],
            StatusCode::FORBIDDEN,
        );
    }

    #[test]
    fn test_checkout_rejections_are_400() {
        status_of(
            &[
                ErrorCode::InsufficientStock,
                ErrorCode::ProductUnavailable,
                ErrorCode::OrderAlreadyPaid,
                ErrorCode::OrderNotCancellable,
                ErrorCode::OrderNotOwned,
                ErrorCode::CartEmpty,
                ErrorCode::QuantityOutOfRange,
                ErrorCode::PaymentNotSucceeded,
                ErrorCode::ValidationFailed,
            ],
            StatusCode::BAD_REQUEST,
        );
    }

    #[test]
    fn test_server_side_failures() {
        assert_eq!(ErrorCode::DatabaseError.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::PaymentProviderError.http_status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ErrorCode::EmailAlreadyRegistered.http_status(), StatusCode::CONFLICT);
    }
}
