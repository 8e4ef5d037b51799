//! Web search skill
//!
//! Queries a DuckDuckGo-compatible instant-answer endpoint and renders the
//! abstract plus related topics as plain text for the model.

use super::{Skill, SkillError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt::Write;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.duckduckgo.com/";
const DEFAULT_MAX_RESULTS: usize = 5;
const MAX_RESULTS_LIMIT: usize = 10;

pub struct WebSearchSkill {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct WebSearchInput {
    query: String,
    #[serde(default)]
    max_results: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Entry {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

impl RelatedTopic {
    fn flatten<'a>(&'a self, out: &mut Vec<(&'a str, &'a str)>) {
        match self {
            RelatedTopic::Entry { text, first_url } => out.push((text.as_str(), first_url.as_str())),
            RelatedTopic::Group { topics } => {
                for topic in topics {
                    topic.flatten(out);
                }
            }
        }
    }
}

impl WebSearchSkill {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            // Builder failure only happens when the TLS backend cannot load;
            // fall back to the default client in that case.
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        }
    }
}

fn render(query: &str, answer: &InstantAnswer, max_results: usize) -> String {
    let mut out = String::new();

    if !answer.abstract_text.is_empty() {
        let heading = if answer.heading.is_empty() {
            query
        } else {
            answer.heading.as_str()
        };
        let _ = writeln!(out, "{heading}: {}", answer.abstract_text);
        if !answer.abstract_url.is_empty() {
            let _ = writeln!(out, "Source: {}", answer.abstract_url);
        }
    }

    let mut topics = Vec::new();
    for topic in &answer.related_topics {
        topic.flatten(&mut topics);
    }
    for (i, (text, url)) in topics.into_iter().take(max_results).enumerate() {
        let _ = writeln!(out, "{}. {text} ({url})", i + 1);
    }

    if out.is_empty() {
        format!("No results found for '{query}'")
    } else {
        out
    }
}

#[async_trait]
impl Skill for WebSearchSkill {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> String {
        "Search the web for up-to-date information. Returns a short summary and a list of related results with their URLs.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "max_results": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_RESULTS_LIMIT,
                    "description": "Maximum number of related results to return"
                }
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<String, SkillError> {
        let input: WebSearchInput =
            serde_json::from_value(input).map_err(SkillError::invalid_input)?;
        let query = input.query.trim();
        if query.is_empty() {
            return Err(SkillError::invalid_input("query must not be empty"));
        }
        let max_results = input
            .max_results
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, MAX_RESULTS_LIMIT);

        tracing::debug!(query, "Running web search");

        let answer: InstantAnswer = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(render(query, &answer, max_results))
    }
}
