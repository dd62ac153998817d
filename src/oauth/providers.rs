//! Per-provider OAuth behaviour as data
//!
//! Each supported provider is one [`ProviderStrategy`] row. The coordinator
//! never branches on the provider name; everything that differs between
//! providers is a column here.

/// How the token request body is encoded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenTransport {
    /// `application/x-www-form-urlencoded`
    Form,
    /// `application/json`
    Json,
}

/// Static description of one OAuth provider
#[derive(Debug)]
pub struct ProviderStrategy {
    /// Lowercase provider id, as used in routes and config
    pub id: &'static str,
    /// Name shown to users
    pub display_name: &'static str,
    /// Default authorization endpoint
    pub authorize_endpoint: &'static str,
    /// Default token endpoint
    pub token_endpoint: &'static str,
    /// Query/body parameter carrying the client id
    pub client_id_param: &'static str,
    /// Separator used to join scopes
    pub scope_delimiter: &'static str,
    /// Fixed parameters appended to the authorize URL
    pub extra_authorize_params: &'static [(&'static str, &'static str)],
    /// Whether the generated state is sent to the provider
    pub include_state: bool,
    /// Whether the flow uses an S256 PKCE challenge
    pub pkce: bool,
    /// Encoding of the token request
    pub token_transport: TokenTransport,
    /// Object the token fields are nested under, if any
    pub response_root: Option<&'static str>,
}

/// Supported providers
pub static PROVIDERS: [ProviderStrategy; 4] = [
    ProviderStrategy {
        id: "instagram",
        display_name: "Instagram",
        authorize_endpoint: "https://api.instagram.com/oauth/authorize",
        token_endpoint: "https://api.instagram.com/oauth/access_token",
        client_id_param: "client_id",
        scope_delimiter: " ",
        extra_authorize_params: &[("response_type", "code")],
        include_state: false,
        pkce: false,
        token_transport: TokenTransport::Form,
        response_root: None,
    },
    ProviderStrategy {
        id: "youtube",
        display_name: "YouTube",
        authorize_endpoint: "https://accounts.google.com/o/oauth2/v2/auth",
        token_endpoint: "https://oauth2.googleapis.com/token",
        client_id_param: "client_id",
        scope_delimiter: " ",
        extra_authorize_params: &[
            ("response_type", "code"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
        include_state: false,
        pkce: false,
        token_transport: TokenTransport::Form,
        response_root: None,
    },
    ProviderStrategy {
        id: "tiktok",
        display_name: "TikTok",
        authorize_endpoint: "https://www.tiktok.com/auth/authorize/",
        token_endpoint: "https://open-api.tiktok.com/oauth/access_token/",
        client_id_param: "client_key",
        scope_delimiter: ",",
        extra_authorize_params: &[("response_type", "code")],
        include_state: true,
        pkce: false,
        token_transport: TokenTransport::Json,
        response_root: Some("data"),
    },
    ProviderStrategy {
        id: "twitter",
        display_name: "Twitter",
        authorize_endpoint: "https://twitter.com/i/oauth2/authorize",
        token_endpoint: "https://api.twitter.com/2/oauth2/token",
        client_id_param: "client_id",
        scope_delimiter: " ",
        extra_authorize_params: &[("response_type", "code")],
        include_state: true,
        pkce: true,
        token_transport: TokenTransport::Form,
        response_root: None,
    },
];

/// Find a provider by id, ignoring case
pub fn lookup(platform: &str) -> Option<&'static ProviderStrategy> {
    PROVIDERS
        .iter()
        .find(|p| p.id.eq_ignore_ascii_case(platform))
}
