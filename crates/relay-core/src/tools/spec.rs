//! Structured tool descriptions with usage guidance.
//!
//! `ToolSpec` replaces free-form description strings with structured
//! metadata: purpose, when to use, when not to use, examples and output
//! format. The rendered description is what MCP clients show the model.

use crate::ToolDef;

/// A structured tool specification with usage guidance.
///
/// `when_not_to_use` is where a tool names its neighbours, e.g. the fetch
/// tools pointing at each other or the Perplexity tools at `search_perplexity`.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Tool name (must be unique within a ToolSet).
    pub name: String,
    /// Human-readable display title.
    pub title: Option<String>,
    /// One-sentence imperative purpose: "Fetch a URL and return Markdown".
    pub purpose: String,
    /// Situations where a client should pick this tool.
    pub when_to_use: String,
    /// Situations better served by a sibling tool, named explicitly.
    pub when_not_to_use: String,
    /// JSON Schema of the arguments object.
    pub parameters: serde_json::Value,
    /// Sample calls, each paired with what comes back.
    pub examples: Vec<UsageExample>,
    /// Shape of the text result. Defaults to "Plain text".
    pub output_format: String,
    /// Requests that look like this tool's job but belong to another one.
    pub disambiguation: Vec<DisambiguationExample>,
}

/// An example clarifying when to use this tool vs a similar one.
#[derive(Debug, Clone)]
pub struct DisambiguationExample {
    /// The request that invites the wrong choice.
    pub scenario: String,
    /// Name of the tool that should handle it.
    pub correct_tool: String,
    /// Short reason, rendered after the tool name.
    pub reason: String,
}

/// A sample call rendered under "Examples:".
#[derive(Debug, Clone)]
pub struct UsageExample {
    /// The call as a client would write it.
    pub input: String,
    /// What the call returns.
    pub output: String,
}

impl ToolSpec {
    /// Create a new ToolSpec builder.
    pub fn builder(name: impl Into<String>) -> ToolSpecBuilder {
        ToolSpecBuilder {
            name: name.into(),
            title: None,
            purpose: None,
            when_to_use: None,
            when_not_to_use: None,
            parameters: None,
            examples: Vec::new(),
            output_format: None,
            disambiguation: Vec::new(),
        }
    }

    /// Render the structured fields into one description string.
    pub fn to_description(&self) -> String {
        let mut desc = format!("{}.", self.purpose);
        desc.push_str(&format!("\nWhen to use: {}", self.when_to_use));
        desc.push_str(&format!("\nWhen NOT to use: {}", self.when_not_to_use));

        if !self.examples.is_empty() {
            desc.push_str("\nExamples:");
            for ex in &self.examples {
                desc.push_str(&format!("\n  - Input: {} → {}", ex.input, ex.output));
            }
        }

        if !self.output_format.is_empty() {
            desc.push_str(&format!("\nOutput format: {}", self.output_format));
        }

        if !self.disambiguation.is_empty() {
            desc.push_str("\nDisambiguation:");
            for d in &self.disambiguation {
                desc.push_str(&format!(
                    "\n  - {}: use '{}' instead, {}",
                    d.scenario, d.correct_tool, d.reason
                ));
            }
        }

        desc
    }

    /// The [`ToolDef`] advertised over MCP: rendered description, schema, and
    /// title when one is set.
    pub fn to_tool_def(&self) -> ToolDef {
        let def = ToolDef::new(
            self.name.clone(),
            self.to_description(),
            self.parameters.clone(),
        );
        match &self.title {
            Some(title) => def.with_title(title.clone()),
            None => def,
        }
    }
}

/// Builder for constructing a `ToolSpec`. Panics on `build()` if required
/// fields are missing, so incomplete specs fail at registration time.
pub struct ToolSpecBuilder {
    name: String,
    title: Option<String>,
    purpose: Option<String>,
    when_to_use: Option<String>,
    when_not_to_use: Option<String>,
    parameters: Option<serde_json::Value>,
    examples: Vec<UsageExample>,
    output_format: Option<String>,
    disambiguation: Vec<DisambiguationExample>,
}

impl ToolSpecBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    pub fn when_to_use(mut self, when: impl Into<String>) -> Self {
        self.when_to_use = Some(when.into());
        self
    }

    pub fn when_not_to_use(mut self, when_not: impl Into<String>) -> Self {
        self.when_not_to_use = Some(when_not.into());
        self
    }

    pub fn parameters(mut self, params: serde_json::Value) -> Self {
        self.parameters = Some(params);
        self
    }

    /// Derive the argument schema from a `schemars::JsonSchema` type, so the
    /// advertised schema and the deserializer cannot drift apart.
    pub fn parameters_for<T: schemars::JsonSchema>(self) -> Self {
        self.parameters(crate::json_schema_for::<T>())
    }

    pub fn example(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.examples.push(UsageExample {
            input: input.into(),
            output: output.into(),
        });
        self
    }

    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn disambiguate(
        mut self,
        scenario: impl Into<String>,
        correct_tool: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        self.disambiguation.push(DisambiguationExample {
            scenario: scenario.into(),
            correct_tool: correct_tool.into(),
            reason: reason.into(),
        });
        self
    }

    /// Shortcut for `.build().to_tool_def()` when the intermediate
    /// `ToolSpec` is not needed.
    pub fn to_tool_def(self) -> ToolDef {
        self.build().to_tool_def()
    }

    /// Build the `ToolSpec`. Panics if required fields are missing.
    pub fn build(self) -> ToolSpec {
        ToolSpec {
            name: self.name,
            title: self.title,
            purpose: self.purpose.expect("ToolSpec requires 'purpose'"),
            when_to_use: self.when_to_use.expect("ToolSpec requires 'when_to_use'"),
            when_not_to_use: self
                .when_not_to_use
                .expect("ToolSpec requires 'when_not_to_use'"),
            parameters: self.parameters.expect("ToolSpec requires 'parameters'"),
            examples: self.examples,
            output_format: self.output_format.unwrap_or_else(|| "Plain text".into()),
            disambiguation: self.disambiguation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_tool_spec() {
        let spec = ToolSpec::builder("simpleWebFetch")
            .title("Simple Web Fetch")
            .purpose("Fetch a URL and return its content as Markdown")
            .when_to_use("When you need the readable text of a single page")
            .when_not_to_use("When you need the page saved to disk, use saveWebFetch instead")
            .parameters(serde_json::json!({
                "type": "object",
                "properties": { "url": { "type": "string" } },
                "required": ["url"]
            }))
            .example(
                r#"simpleWebFetch(url="https://example.com")"#,
                "Markdown body followed by a cache pointer",
            )
            .output_format("Markdown")
            .build();

        assert_eq!(spec.name, "simpleWebFetch");
        assert!(spec.to_description().contains("When NOT to use:"));
        assert!(spec.to_description().contains("saveWebFetch"));
    }

    #[test]
    fn to_tool_def_carries_title_and_schema() {
        let def = ToolSpec::builder("ask_perplexity")
            .title("Ask Perplexity")
            .purpose("Ask a question")
            .when_to_use("When testing")
            .when_not_to_use("Never")
            .parameters(serde_json::json!({"type": "object", "properties": {}}))
            .disambiguate("Needs raw links", "search_perplexity", "it returns a ranked list")
            .to_tool_def();

        assert_eq!(def.name, "ask_perplexity");
        assert_eq!(def.title.as_deref(), Some("Ask Perplexity"));
        assert_eq!(def.input_schema["type"], "object");
        assert!(def.description.contains("Disambiguation:"));
    }

    #[test]
    fn description_renders_every_section_in_order() {
        let spec = ToolSpec::builder("search_perplexity")
            .purpose("Search the web")
            .when_to_use("You need ranked links")
            .when_not_to_use("You need a written answer")
            .parameters(serde_json::json!({"type": "object"}))
            .example(r#"search_perplexity(query="tokio")"#, "numbered results")
            .disambiguate("Wants a summary", "ask_perplexity", "it writes prose")
            .build();

        assert_eq!(spec.output_format, "Plain text");
        assert_eq!(
            spec.to_description(),
            "Search the web.\n\
             When to use: You need ranked links\n\
             When NOT to use: You need a written answer\n\
             Examples:\n  - Input: search_perplexity(query=\"tokio\") → numbered results\n\
             Output format: Plain text\n\
             Disambiguation:\n  - Wants a summary: use 'ask_perplexity' instead, it writes prose"
        );
        assert_eq!(spec.disambiguation[0].correct_tool, "ask_perplexity");
        assert_eq!(spec.examples[0].output, "numbered results");
    }

    #[test]
    #[should_panic(expected = "ToolSpec requires 'purpose'")]
    fn builder_panics_on_missing_purpose() {
        ToolSpec::builder("incomplete")
            .when_to_use("test")
            .when_not_to_use("test")
            .parameters(serde_json::json!({}))
            .build();
    }
}
