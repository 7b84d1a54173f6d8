//! Social media specialist: adapts the edited piece into per-platform posts

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::invoker::Invoker;
use crate::model::{PlatformVariant, WorkflowRequest};
use crate::parse::{extract_json, extract_list_after_keyword, require_fields};

use super::{AgentContext, AgentId, ContentAgent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialPosts {
    pub posts: Vec<PlatformVariant>,
}

pub struct SocialMediaSpecialist {
    invoker: Arc<Invoker>,
}

impl SocialMediaSpecialist {
    pub fn new(invoker: Arc<Invoker>) -> Self {
        Self { invoker }
    }
}

fn parse(reply: &str) -> Result<Value> {
    let value = extract_json(reply)?;
    require_fields(&value, &["posts"])?;
    let social: SocialPosts = serde_json::from_value(value)
        .map_err(|e| PipelineError::Parse(format!("social posts shape: {}", e)))?;
    if social.posts.is_empty() {
        return Err(PipelineError::Validation("posts".to_string()));
    }
    Ok(serde_json::to_value(social).unwrap_or(Value::Null))
}

/// Recovery produces one generic post from the raw reply, truncated to a
/// conservative cross-platform length
fn fallback(reply: &str) -> Option<Value> {
    let text: String = reply
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(280)
        .collect();
    if text.is_empty() {
        return None;
    }
    let social = SocialPosts {
        posts: vec![PlatformVariant {
            platform: "generic".to_string(),
            text,
            hashtags: extract_list_after_keyword(reply, "hashtag"),
        }],
    };
    serde_json::to_value(social).ok()
}

#[async_trait]
impl ContentAgent for SocialMediaSpecialist {
    fn id(&self) -> AgentId {
        AgentId::SocialMediaSpecialist
    }

    fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    fn build_prompt(&self, request: &WorkflowRequest, context: &AgentContext) -> String {
        let platforms = if request.platforms.is_empty() {
            "twitter, linkedin".to_string()
        } else {
            request.platforms.join(", ")
        };
        format!(
            "You are a social media specialist. Adapt the article below into posts for \
             these platforms: {platforms}. Respect each platform's length conventions.\n\n\
             Article:\n{article}\n\n\
             Reply with a single JSON object, no prose, with this field:\n\
             {{\"posts\": [{{\"platform\": string, \"text\": string, \
             \"hashtags\": [string]}}]}}",
            platforms = platforms,
            article = context.context_block(AgentId::ContentEditor),
        )
    }

    fn parse_reply(&self, reply: &str) -> Result<Value> {
        parse(reply)
    }

    fn fallback_parse(&self, reply: &str) -> Option<Value> {
        fallback(reply)
    }

    fn summarize(&self, output: &Value) -> Option<String> {
        let posts = output["posts"].as_array().map(Vec::len).unwrap_or(0);
        Some(format!("{} posts", posts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_parse_rejects_an_empty_post_list() {
        let reply = json!({"posts": []}).to_string();
        let err = parse(&reply).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(f) if f == "posts"));
    }

    #[test]
    fn strict_parse_accepts_typed_posts() {
        let reply = json!({
            "posts": [
                {"platform": "linkedin", "text": "Long-form take.", "hashtags": ["#ai"]},
                {"platform": "twitter", "text": "Short take."}
            ]
        })
        .to_string();
        let value = parse(&reply).unwrap();
        assert_eq!(value["posts"][1]["platform"], "twitter");
        assert_eq!(value["posts"][1]["hashtags"], json!([]));
    }

    #[test]
    fn fallback_builds_one_truncated_generic_post() {
        let reply = "word ".repeat(100);
        let value = fallback(&reply).unwrap();
        let posts = value["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["platform"], "generic");
        assert!(posts[0]["text"].as_str().unwrap().chars().count() <= 280);
    }
}
