//! Pure endpoint classification predicates.
//!
//! Matching is deliberately case-insensitive substring matching, not strict
//! URL-host parsing; the configuration surface accepts endpoints with or
//! without schemes, ports, and trailing paths.

/// Whether the endpoint is an Azure OpenAI endpoint.
///
/// Azure OpenAI endpoints match one of:
///   - `*.openai.azure.com`
///   - `*.cognitiveservices.azure.com`
pub fn is_azure_endpoint(endpoint: &str) -> bool {
    if endpoint.is_empty() {
        return false;
    }
    let lower = endpoint.to_lowercase();
    lower.contains("openai.azure.com") || lower.contains("cognitiveservices.azure.com")
}

/// Whether the endpoint is the standard OpenAI API endpoint (`api.openai.com`).
pub fn is_openai_endpoint(endpoint: &str) -> bool {
    if endpoint.is_empty() {
        return false;
    }
    endpoint.to_lowercase().contains("api.openai.com")
}

/// Whether the endpoint is a local/self-hosted endpoint: `localhost`,
/// `127.0.0.1`, `0.0.0.0`, or a common private LAN range (`192.168.*`, `10.*`).
pub fn is_local_endpoint(endpoint: &str) -> bool {
    if endpoint.is_empty() {
        return false;
    }
    let lower = endpoint.to_lowercase();
    lower.contains("localhost")
        || lower.contains("127.0.0.1")
        || lower.contains("0.0.0.0")
        || lower.contains("192.168.")
        || lower.contains("10.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn azure_endpoints() {
        assert!(is_azure_endpoint("https://myresource.openai.azure.com"));
        assert!(is_azure_endpoint("https://myresource.cognitiveservices.azure.com"));
        assert!(is_azure_endpoint("HTTPS://MYRESOURCE.OPENAI.AZURE.COM/"));
        assert!(!is_azure_endpoint("https://api.openai.com"));
        assert!(!is_azure_endpoint("http://localhost:1234"));
        assert!(!is_azure_endpoint(""));
    }

    #[test]
    fn openai_endpoints() {
        assert!(is_openai_endpoint("https://api.openai.com/v1"));
        assert!(is_openai_endpoint("API.OPENAI.COM"));
        assert!(!is_openai_endpoint("https://myresource.openai.azure.com"));
        assert!(!is_openai_endpoint("http://localhost:1234"));
        assert!(!is_openai_endpoint(""));
    }

    #[test]
    fn local_endpoints() {
        assert!(is_local_endpoint("http://localhost:1234"));
        assert!(is_local_endpoint("http://127.0.0.1:8080"));
        assert!(is_local_endpoint("http://0.0.0.0:5000"));
        assert!(is_local_endpoint("http://192.168.1.100:5000"));
        assert!(is_local_endpoint("http://10.0.0.5"));
        assert!(!is_local_endpoint("https://api.openai.com"));
        assert!(!is_local_endpoint(""));
    }
}
