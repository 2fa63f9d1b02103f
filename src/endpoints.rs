//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/bank/connections/{connection_id}/sync',
//! use [format_endpoint].

/// The route for linking a bank with an authorization code.
pub const AUTHORIZE: &str = "/api/bank/authorize";
/// The route for listing the bank connections of a project.
pub const PROJECT_CONNECTIONS: &str = "/api/projects/{project_id}/bank/connections";
/// The route for unlinking a bank connection.
pub const CONNECTION: &str = "/api/bank/connections/{connection_id}";
/// The route for synchronizing a bank connection on demand.
pub const SYNC_CONNECTION: &str = "/api/bank/connections/{connection_id}/sync";
/// The route for listing the transactions of a bank connection.
pub const CONNECTION_TRANSACTIONS: &str = "/api/bank/connections/{connection_id}/transactions";
/// The route for converting a bank transaction into an expense.
pub const CONVERT_TRANSACTION: &str = "/api/bank/transactions/{transaction_id}/convert";
/// The route for ignoring a bank transaction.
pub const IGNORE_TRANSACTION: &str = "/api/bank/transactions/{transaction_id}/ignore";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::AUTHORIZE);
        assert_endpoint_is_valid_uri(endpoints::PROJECT_CONNECTIONS);
        assert_endpoint_is_valid_uri(endpoints::CONNECTION);
        assert_endpoint_is_valid_uri(endpoints::SYNC_CONNECTION);
        assert_endpoint_is_valid_uri(endpoints::CONNECTION_TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::CONVERT_TRANSACTION);
        assert_endpoint_is_valid_uri(endpoints::IGNORE_TRANSACTION);
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint(endpoints::SYNC_CONNECTION, 1);

        assert_eq!(formatted_path, "/api/bank/connections/1/sync");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint(endpoints::AUTHORIZE, 1);

        assert_eq!(formatted_path, "/api/bank/authorize");
    }

    #[test]
    fn parameter_at_end() {
        let formatted_path = format_endpoint(endpoints::CONNECTION, 12);

        assert_eq!(formatted_path, "/api/bank/connections/12");
    }
}
