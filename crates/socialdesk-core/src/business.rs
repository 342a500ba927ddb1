//! Business profile service.
//!
//! One optional profile per authenticated user. The chat pipeline feeds it
//! into the system prompt so answers are tailored to the user's business.

use chrono::Utc;
use serde::Deserialize;
use socialdesk_types::error::BusinessError;
use socialdesk_types::user::BusinessProfile;

use crate::repository::user::BusinessRepository;

/// Fields a user may set on their profile.
#[derive(Debug, Clone, Deserialize)]
pub struct BusinessInput {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct BusinessService<B: BusinessRepository> {
    repo: B,
}

impl<B: BusinessRepository> BusinessService<B> {
    pub fn new(repo: B) -> Self {
        Self { repo }
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<BusinessProfile>, BusinessError> {
        Ok(self.repo.get(user_id).await?)
    }

    /// Create the profile or replace its fields.
    pub async fn save(
        &self,
        user_id: &str,
        input: BusinessInput,
    ) -> Result<BusinessProfile, BusinessError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(BusinessError::Validation(
                "business name cannot be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let profile = BusinessProfile {
            user_id: user_id.to_string(),
            name,
            url: non_blank(input.url),
            description: non_blank(input.description),
            created_at: now,
            updated_at: now,
        };
        Ok(self.repo.upsert(&profile).await?)
    }

    pub async fn delete(&self, user_id: &str) -> Result<(), BusinessError> {
        if self.repo.delete(user_id).await? {
            Ok(())
        } else {
            Err(BusinessError::NotFound)
        }
    }
}
