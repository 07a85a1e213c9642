//! Minimal secret resolution: prefer the direct env var, fall back to the
//! `_ARN`/`_SECRET_ARN` variant's value. Actually calling out to AWS Secrets
//! Manager for the ARN case is a deployment concern (out of scope per the
//! purpose & scope section); this module only preserves the "env var or
//! ARN-named secret" shape so a real Secrets Manager client has a seam to
//! plug into later.

use std::env;

fn resolve(direct_var: &str, arn_var: &str) -> Option<String> {
    env::var(direct_var)
        .ok()
        .or_else(|| env::var(arn_var).ok())
}

pub fn database_url() -> Option<String> {
    resolve("DATABASE_URL", "DB_SECRET_ARN")
}

pub fn openai_api_key() -> Option<String> {
    resolve("OPENAI_API_KEY", "OPENAI_SECRET_ARN")
}

pub fn gemini_api_key() -> Option<String> {
    resolve("GEMINI_API_KEY", "GEMINI_SECRET_ARN")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn direct_var_wins_over_arn() {
        env::set_var("CURATOR_TEST_DIRECT", "direct-value");
        env::set_var("CURATOR_TEST_ARN", "arn-value");
        assert_eq!(
            resolve("CURATOR_TEST_DIRECT", "CURATOR_TEST_ARN"),
            Some("direct-value".to_string())
        );
        env::remove_var("CURATOR_TEST_DIRECT");
        env::remove_var("CURATOR_TEST_ARN");
    }

    #[test]
    fn falls_back_to_arn_when_direct_missing() {
        env::remove_var("CURATOR_TEST_DIRECT2");
        env::set_var("CURATOR_TEST_ARN2", "arn-value");
        assert_eq!(
            resolve("CURATOR_TEST_DIRECT2", "CURATOR_TEST_ARN2"),
            Some("arn-value".to_string())
        );
        env::remove_var("CURATOR_TEST_ARN2");
    }
}
