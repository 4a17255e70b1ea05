//! System directives for the planner and step executor
//!
//! Directive text is configuration, not code: the defaults here are minimal
//! and deployments are expected to supply their own. Two placeholders are
//! substituted at render time: `{owner}` and `{step_id}`.

use crate::plan::StepId;
use steward_capability::{builtin, CapabilityDescriptor, OwnerId};

const DEFAULT_PLANNER: &str = "You are the planning role of an autonomous assistant working for {owner}. \
Break the request into steps and submit them with propose_plan, listing for each step the \
capabilities it needs. After each step you receive a short summary; full details are in the \
scratchpad. When the work is done, reply with the final answer as plain text.";

const DEFAULT_WORKER: &str = "You are executing step {step_id} of a larger task for {owner}. \
Use only the capabilities offered. Save full, untruncated capability output with \
write_scratchpad, then reply with a concise result as plain text.";

/// Planner and step-executor directives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directives {
    /// Planner directive template
    pub planner: String,
    /// Step-executor directive template
    pub worker: String,
}

impl Default for Directives {
    fn default() -> Self {
        Self {
            planner: DEFAULT_PLANNER.to_string(),
            worker: DEFAULT_WORKER.to_string(),
        }
    }
}

impl Directives {
    /// Create from explicit templates
    pub fn new(planner: impl Into<String>, worker: impl Into<String>) -> Self {
        Self {
            planner: planner.into(),
            worker: worker.into(),
        }
    }

    /// Planner directive followed by the capability catalogue
    #[must_use]
    pub fn render_planner<'a>(
        &self,
        owner: &OwnerId,
        catalogue: impl IntoIterator<Item = &'a CapabilityDescriptor>,
    ) -> String {
        let read = builtin::read_scratchpad();
        let lines: Vec<String> = catalogue
            .into_iter()
            .map(catalogue_line)
            .chain(std::iter::once(catalogue_line(&read)))
            .collect();

        format!(
            "{}\n\n## Available Capabilities:\n{}",
            substitute(&self.planner, owner, None),
            lines.join("\n")
        )
    }

    /// Step-executor directive for one step
    #[must_use]
    pub fn render_worker(&self, owner: &OwnerId, step: StepId) -> String {
        substitute(&self.worker, owner, Some(step))
    }
}

fn catalogue_line(descriptor: &CapabilityDescriptor) -> String {
    format!("- {}: {}", descriptor.name, descriptor.description)
}

fn substitute(template: &str, owner: &OwnerId, step: Option<StepId>) -> String {
    let text = template.replace("{owner}", owner.as_str());
    match step {
        Some(id) => text.replace("{step_id}", &id.to_string()),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn worker_placeholders_are_substituted() {
        let directives = Directives::new("plan", "step {step_id} for {owner}");
        assert_eq!(
            directives.render_worker(&OwnerId::from("chat-9"), 3),
            "step 3 for chat-9"
        );
    }

    #[test]
    fn planner_lists_capabilities_and_scratchpad() {
        let directives = Directives::new("Plan for {owner}.", "");
        let search = CapabilityDescriptor::new("web_search", "Search the web", json!({}));
        let text = directives.render_planner(&OwnerId::from("chat-1"), [&search]);

        assert!(text.starts_with("Plan for chat-1."));
        assert!(text.contains("- web_search: Search the web"));
        assert!(text.ends_with(&format!(
            "- read_scratchpad: {}",
            builtin::read_scratchpad().description
        )));
    }
}
