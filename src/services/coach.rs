//! AI coach commentary.
//!
//! Builds a bounded prompt from the recent daily table and the upcoming
//! plan, posts it to a generative-text endpoint and returns the reply text.
//! Commentary is decoration: the caller shows a placeholder when the
//! service is unreachable.

use crate::error::ServiceError;
use crate::models::{DailyLoad, PlannedWorkout};
use crate::services::with_retry;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Recent history included in the prompt, in days
const PROMPT_HISTORY_DAYS: usize = 14;

/// Upcoming workouts included in the prompt
const PROMPT_UPCOMING_WORKOUTS: usize = 7;

pub struct CoachClient {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

impl CoachClient {
    pub fn new(
        endpoint: String,
        api_key: String,
        timeout_seconds: u64,
    ) -> Result<Self, ServiceError> {
        let timeout = Duration::from_secs(timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(CoachClient {
            client,
            endpoint,
            api_key,
            timeout,
        })
    }

    /// Ask for commentary on the athlete's recent load and upcoming plan.
    /// Retries once on transient failures.
    pub fn commentary(
        &self,
        recent: &[DailyLoad],
        upcoming: &[PlannedWorkout],
    ) -> Result<String, ServiceError> {
        let prompt = build_prompt(recent, upcoming);
        with_retry(|| self.generate(&prompt))
    }

    fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        debug!(prompt_len = prompt.len(), "requesting coach commentary");

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout {
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    ServiceError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ServiceError::Quota);
        }
        if !status.is_success() {
            return Err(ServiceError::Http {
                status: status.as_u16(),
            });
        }

        let body: GenerateResponse = response
            .json()
            .map_err(|e| ServiceError::BadResponse(e.to_string()))?;

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| ServiceError::BadResponse("empty candidate list".to_string()))
    }
}

/// Render a prompt bounded to recent history plus the next few workouts so
/// a long training log never inflates the request.
fn build_prompt(recent: &[DailyLoad], upcoming: &[PlannedWorkout]) -> String {
    let mut prompt = String::from(
        "You are a running coach reviewing an athlete's training load.\n\
         CTL is chronic (42-day) load, ATL is acute (7-day) load, and\n\
         TSB = CTL - ATL is form. Summarize how training is going and what\n\
         to watch in the coming week, in three short paragraphs.\n\n\
         Recent daily load:\n",
    );

    let start = recent.len().saturating_sub(PROMPT_HISTORY_DAYS);
    for day in &recent[start..] {
        let _ = writeln!(
            prompt,
            "{}: stress {:.0}, CTL {:.1}, ATL {:.1}, TSB {:.1}",
            day.date, day.actual_stress, day.ctl, day.atl, day.tsb
        );
    }

    prompt.push_str("\nUpcoming plan:\n");
    if upcoming.is_empty() {
        prompt.push_str("(nothing scheduled)\n");
    }
    for workout in upcoming.iter().take(PROMPT_UPCOMING_WORKOUTS) {
        let _ = writeln!(prompt, "{}: {}", workout.date, workout.description);
    }

    prompt
}
