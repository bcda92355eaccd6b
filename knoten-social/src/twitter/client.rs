//! Minimal wrapper around the Twitter/X v2 write API.
//!
//! Signs every request with the configured user-context credentials before
//! delegating to the shared HTTP client. Nothing is retried: a failed post
//! surfaces as [`KnotenError::Post`].
use crate::twitter::oauth::OAuthCredentials;
use crate::twitter::types::{CreateTweetRequest, CreateTweetResponse};
use crate::{FeedPoster, PostedStatus};
use async_trait::async_trait;
use knoten_common::{KnotenError, Result};
use knoten_http::header::{AUTHORIZATION, HeaderValue};
use knoten_http::{Auth, HttpClient, RequestOpts};

const TWEETS_PATH: &str = "2/tweets";

#[derive(Clone)]
pub struct TwitterApi {
    http: HttpClient,
    credentials: OAuthCredentials,
}

impl TwitterApi {
    pub fn new(api_base: &str, credentials: OAuthCredentials) -> Result<Self> {
        let http = HttpClient::new(api_base)
            .map_err(|e| KnotenError::Config(format!("twitter api base: {e}")))?;
        Ok(Self { http, credentials })
    }

    pub async fn create_tweet(&self, text: &str) -> Result<CreateTweetResponse> {
        let url = self
            .http
            .resolve(TWEETS_PATH, false)
            .map_err(|e| KnotenError::Post(e.to_string()))?;
        let header = self.credentials.authorization_header("POST", &url, &[]);
        let value = HeaderValue::from_str(&header)
            .map_err(|e| KnotenError::Post(format!("invalid OAuth header: {e}")))?;

        let resp: CreateTweetResponse = self
            .http
            .post_json_opts(
                TWEETS_PATH,
                &CreateTweetRequest { text },
                RequestOpts {
                    auth: Some(Auth::Header {
                        name: AUTHORIZATION,
                        value,
                    }),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| KnotenError::Post(e.to_string()))?;

        tracing::debug!(tweet_id = %resp.data.id, "twitter.tweet.created");
        Ok(resp)
    }
}

#[async_trait]
impl FeedPoster for TwitterApi {
    async fn post(&self, text: &str) -> Result<PostedStatus> {
        let resp = self.create_tweet(text).await?;
        let text = if resp.data.text.is_empty() {
            text.to_string()
        } else {
            resp.data.text
        };
        Ok(PostedStatus {
            id: resp.data.id,
            text,
        })
    }
}
