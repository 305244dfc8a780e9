//! Request types for the question-answering endpoint

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Oldest age accepted in a profile
pub const MAX_AGE: u32 = 150;

/// Optional biometric and preference attributes of the asking user
///
/// Every field is independent; `None` means "unknown", never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Age in years
    #[serde(default)]
    pub age: Option<u32>,
    /// Weight in kg
    #[serde(default)]
    pub weight: Option<f64>,
    /// Height in cm
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub gender: Option<String>,
    /// Physical activity level (e.g. sedentary, moderate, intense)
    #[serde(default)]
    pub activity_level: Option<String>,
    /// Nutrition goal (weight loss, muscle gain, maintenance, general wellbeing)
    #[serde(default)]
    pub goal: Option<String>,
    /// Dietary preferences, intolerances or allergies
    #[serde(default)]
    pub dietary_preferences: Option<String>,
}

impl UserProfile {
    /// Reject values outside their physical range
    pub fn validate(&self) -> Result<()> {
        if let Some(age) = self.age {
            if age > MAX_AGE {
                return Err(Error::validation(format!(
                    "age must be between 0 and {}",
                    MAX_AGE
                )));
            }
        }
        for (name, value) in [("weight", self.weight), ("height", self.height)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::validation(format!(
                        "{} must be a non-negative number",
                        name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// POST /ask request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The user's question
    pub question: String,
    /// Optional user profile
    #[serde(default)]
    pub user_data: Option<UserProfile>,
}

impl AskRequest {
    /// Create a new request without a profile
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            user_data: None,
        }
    }

    /// Attach a user profile
    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.user_data = Some(profile);
        self
    }

    /// Check the question and profile before any provider is called
    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(Error::validation("question must not be empty"));
        }
        if let Some(profile) = &self.user_data {
            profile.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_partial_profile() {
        let request: AskRequest = serde_json::from_str(
            r#"{"question": "How much protein?", "user_data": {"age": 30, "goal": "muscle gain"}}"#,
        )
        .unwrap();
        let profile = request.user_data.unwrap();
        assert_eq!(profile.age, Some(30));
        assert_eq!(profile.goal.as_deref(), Some("muscle gain"));
        assert!(profile.weight.is_none());
        assert!(profile.dietary_preferences.is_none());
    }

    #[test]
    fn test_validation() {
        assert!(AskRequest::new("   ").validate().is_err());
        assert!(AskRequest::new("Is coffee healthy?").validate().is_ok());

        let too_old = UserProfile {
            age: Some(151),
            ..Default::default()
        };
        assert!(AskRequest::new("q").with_profile(too_old).validate().is_err());

        let negative = UserProfile {
            weight: Some(-3.0),
            ..Default::default()
        };
        assert!(matches!(negative.validate(), Err(Error::Validation(_))));

        let zero_age = UserProfile {
            age: Some(0),
            ..Default::default()
        };
        assert!(zero_age.validate().is_ok());
    }
}
