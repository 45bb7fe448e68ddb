use super::sender::{HttpReply, HttpSender, SendError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted [`HttpSender`] for tests.
///
/// Replies are served in order. When the queue runs dry the last scripted
/// reply repeats, so "always 503" needs a single entry.
pub struct MockSender {
    replies: Mutex<VecDeque<MockReply>>,
    last: Mutex<Option<MockReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

#[derive(Debug, Clone)]
pub enum MockReply {
    Reply(HttpReply),
    Error(SendError),
    /// Never answers; exercises the transport's own timeout
    Hang,
}

impl MockReply {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        MockReply::Reply(HttpReply::new(status, body))
    }

    pub fn json(status: u16, body: &Value) -> Self {
        MockReply::Reply(HttpReply::new(status, body.to_string()))
    }

    pub fn rate_limited(retry_after: Option<u64>) -> Self {
        MockReply::Reply(HttpReply {
            status: 429,
            body: r#"{"error": {"message": "Too many requests"}}"#.to_string(),
            retry_after,
        })
    }

    pub fn error(error: SendError) -> Self {
        MockReply::Error(error)
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
    pub timeout: Duration,
}

impl MockSender {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let sender = Self::new();
        sender.add_replies(replies);
        sender
    }

    pub fn add_replies(&self, replies: impl IntoIterator<Item = MockReply>) {
        let mut queue = self.replies.lock().unwrap();
        for reply in replies {
            queue.push_back(reply);
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Option<MockReply> {
        let next = self.replies.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                Some(reply)
            }
            None => last.clone(),
        }
    }
}

impl Default for MockSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpSender for MockSender {
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpReply, SendError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            headers: headers.to_vec(),
            body: body.clone(),
            timeout,
        });

        match self.next_reply() {
            Some(MockReply::Reply(reply)) => Ok(reply),
            Some(MockReply::Error(error)) => Err(error),
            Some(MockReply::Hang) => {
                std::future::pending::<()>().await;
                Err(SendError::Timeout(timeout))
            }
            None => Err(SendError::Other(
                "MockSender: no replies scripted".to_string(),
            )),
        }
    }
}
