/// HTTP status vocabulary used by diagnostic records
///
/// Codes are grouped the usual way:
/// - 200-299: Success
/// - 400-499: Client errors
/// - 500-599: Server errors
///
/// Anything at or above [`StatusCode::FAILURE_THRESHOLD`] marks a chain as failed.
pub struct StatusCode;

impl StatusCode {
    // Success (200-299)
    pub const OK: u16 = 200;
    pub const CREATED: u16 = 201;
    pub const ACCEPTED: u16 = 202;
    pub const NO_CONTENT: u16 = 204;

    // Client errors (400-499)
    pub const BAD_REQUEST: u16 = 400;
    pub const UNAUTHORIZED: u16 = 401;
    pub const FORBIDDEN: u16 = 403;
    pub const NOT_FOUND: u16 = 404;
    pub const METHOD_NOT_ALLOWED: u16 = 405;
    pub const NOT_ACCEPTABLE: u16 = 406;
    pub const REQUEST_TIMEOUT: u16 = 408;
    pub const CONFLICT: u16 = 409;
    pub const GONE: u16 = 410;

    // Server errors (500-599)
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
    pub const NOT_IMPLEMENTED: u16 = 501;
    pub const SERVICE_UNAVAILABLE: u16 = 503;

    pub const FAILURE_THRESHOLD: u16 = 400;
}

/// Whether a single status counts as a failure
pub fn is_failure(status: u16) -> bool {
    status >= StatusCode::FAILURE_THRESHOLD
}

/// Get a human-readable reason phrase for a status code
pub fn describe_status(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",

        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",

        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",

        _ => "Unknown Status",
    }
}
