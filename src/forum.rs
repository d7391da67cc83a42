//! Reddit client for posting the forecast into the daily discussion thread.

use std::env;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ForumSettings;
use crate::constants::forum::{API_BASE, THREAD_DATE_FORMAT, TOKEN_URL};
use crate::error::ForecastError;

/// Script-app credentials, read from the environment (or `.env`).
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl RedditCredentials {
    pub fn from_env() -> Result<Self, ForecastError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ForecastError> {
        let var = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ForecastError::Forum(format!("{} not set", name)))
        };
        Ok(Self {
            client_id: var("REDDIT_CLIENT_ID")?,
            client_secret: var("REDDIT_CLIENT_SECRET")?,
            username: var("REDDIT_USERNAME")?,
            password: var("REDDIT_PASSWORD")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

/// Body of `/api/comment` with `api_type=json`. Rejections still come back as HTTP 200.
#[derive(Debug, Deserialize)]
struct CommentResponse {
    json: CommentJson,
}

#[derive(Debug, Deserialize)]
struct CommentJson {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
}

impl CommentResponse {
    fn into_result(self) -> Result<(), ForecastError> {
        if self.json.errors.is_empty() {
            return Ok(());
        }
        let reasons: Vec<String> = self
            .json
            .errors
            .iter()
            .map(|error| {
                error
                    .iter()
                    .filter_map(|part| part.as_str())
                    .collect::<Vec<_>>()
                    .join(": ")
            })
            .collect();
        Err(ForecastError::Forum(format!("comment rejected: {}", reasons.join("; "))))
    }
}

#[derive(Debug, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
pub struct Thing {
    pub data: Submission,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Submission {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub stickied: bool,
}

impl Submission {
    /// Fullname used by the comment endpoint.
    pub fn fullname(&self) -> String {
        format!("t3_{}", self.id)
    }
}

/// Title fragment of the daily discussion thread for `date`, e.g. "October 19, 2026".
pub fn thread_date(date: NaiveDate) -> String {
    date.format(THREAD_DATE_FORMAT).to_string()
}

/// First stickied submission whose title carries `date`.
pub fn find_daily_thread<'a>(submissions: &'a [Submission], date: &str) -> Option<&'a Submission> {
    submissions
        .iter()
        .filter(|s| s.stickied)
        .find(|s| s.title.contains(date))
}

pub struct RedditClient {
    client: Client,
    settings: ForumSettings,
    token: String,
}

impl RedditClient {
    /// Log in with the password grant.
    pub async fn login(settings: ForumSettings, credentials: &RedditCredentials) -> Result<Self, ForecastError> {
        let client = Client::builder().user_agent(settings.user_agent.as_str()).build()?;

        let response: TokenResponse = client
            .post(TOKEN_URL)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let token = match (response.access_token, response.error) {
            (Some(token), _) => token,
            (None, Some(error)) => return Err(ForecastError::Forum(format!("login refused: {}", error))),
            (None, None) => return Err(ForecastError::Forum("login returned no token".to_string())),
        };
        info!("🔑 Logged in to Reddit as {}", credentials.username);

        Ok(Self {
            client,
            settings,
            token,
        })
    }

    pub async fn hot(&self) -> Result<Vec<Submission>, ForecastError> {
        let url = format!("{}/r/{}/hot", API_BASE, self.settings.subreddit);
        let listing: Listing = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("limit", self.settings.hot_limit)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(listing.data.children.into_iter().map(|thing| thing.data).collect())
    }

    pub async fn find_daily_thread(&self, date: NaiveDate) -> Result<Submission, ForecastError> {
        let date = thread_date(date);
        let hot = self.hot().await?;
        debug!("Hot posts in r/{}: {:?}", self.settings.subreddit, hot);

        find_daily_thread(&hot, &date).cloned().ok_or_else(|| {
            ForecastError::Forum(format!(
                "no daily discussion thread for {} in r/{}",
                date, self.settings.subreddit
            ))
        })
    }

    /// Reply to `thread` with `text` plus the configured signature.
    pub async fn reply(&self, thread: &Submission, text: &str) -> Result<(), ForecastError> {
        let body = format!("{}{}", text, self.settings.signature);
        let url = format!("{}/api/comment", API_BASE);
        let response: CommentResponse = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .form(&[
                ("api_type", "json"),
                ("thing_id", thread.fullname().as_str()),
                ("text", body.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.into_result()?;

        info!("📮 Posted forecast to '{}'", thread.title);
        Ok(())
    }
}
