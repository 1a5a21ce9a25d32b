//! User Types
//!
//! Local user record and the identity claims a provider vouches for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Signed in but not yet onboarded.
    #[default]
    Guest,
    User,
}

/// Social login provider a user signed up with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SocialType {
    #[default]
    Kakao,
}

/// Local user record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Provider-side subject identifier.
    pub provider_id: String,
    pub name: String,
    pub email: String,
    pub nickname: String,
    /// Profile image URL.
    pub profile: String,
    pub social_type: SocialType,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new user from first-login claims.
    pub fn from_claims(claims: &ProviderClaims, social_type: SocialType) -> Self {
        let now = Utc::now();
        let nickname = claims
            .nickname
            .clone()
            .unwrap_or_else(|| format!("user{}", claims.provider_id));
        Self {
            id: Uuid::new_v4(),
            provider_id: claims.provider_id.clone(),
            name: claims.name.clone().unwrap_or_else(|| nickname.clone()),
            email: claims.email.clone(),
            nickname,
            profile: claims.profile_image.clone().unwrap_or_default(),
            social_type,
            role: Role::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Verified identity claims returned by the provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderClaims {
    pub provider_id: String,
    pub email: String,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub profile_image: Option<String>,
}

/// Kakao `/v2/user/me` payload.
#[derive(Clone, Debug, Deserialize)]
pub struct KakaoUserInfo {
    pub id: i64,
    #[serde(default)]
    pub kakao_account: Option<KakaoAccount>,
    #[serde(default)]
    pub properties: Option<KakaoProperties>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct KakaoAccount {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile: Option<KakaoProfile>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct KakaoProfile {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct KakaoProperties {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl KakaoUserInfo {
    /// Convert into claims. Email is the unique key, so it is required.
    pub fn into_claims(self) -> Option<ProviderClaims> {
        let account = self.kakao_account.unwrap_or(KakaoAccount {
            email: None,
            name: None,
            profile: None,
        });
        let email = account.email?;
        let profile = account.profile;
        let properties = self.properties;

        let nickname = profile
            .as_ref()
            .and_then(|p| p.nickname.clone())
            .or_else(|| properties.as_ref().and_then(|p| p.nickname.clone()));
        let profile_image = profile
            .as_ref()
            .and_then(|p| p.profile_image_url.clone())
            .or_else(|| properties.as_ref().and_then(|p| p.profile_image.clone()));

        Some(ProviderClaims {
            provider_id: self.id.to_string(),
            email,
            name: account.name,
            nickname,
            profile_image,
        })
    }
}
