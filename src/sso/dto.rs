use serde::Deserialize;

/// Token endpoint response; the provider returns the authenticated profile
/// alongside the access token.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub profile: Option<ProfileDto>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileDto {
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}
