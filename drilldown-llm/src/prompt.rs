//! Prompt construction.
//!
//! [`OptionsPrompt`] is a plain value built from a request, so it can be
//! inspected in tests before it is rendered to text.

use drilldown_core::{options_floor, NavigationRequest, MAX_REQUESTED_BUCKETS, MIN_REQUESTED_BUCKETS};

const ROOT_PATH: &str = "(root — no selections yet)";
const PATH_SEPARATOR: &str = " > ";

/// Structured prompt for one navigation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsPrompt {
    pub level0: String,
    pub domain_label: String,
    pub path_labels: Vec<String>,
    pub depth: usize,
    pub min_count: u32,
    pub max_count: u32,
}

impl OptionsPrompt {
    pub fn from_request(request: &NavigationRequest) -> Self {
        Self {
            level0: request.domain().as_str().to_string(),
            domain_label: request.domain().label().to_string(),
            path_labels: request.path_labels(),
            depth: request.depth(),
            min_count: options_floor(request.max_options()),
            max_count: request.max_options(),
        }
    }

    /// Path rendered for the model, with the root case spelled out.
    pub fn path_display(&self) -> String {
        if self.path_labels.is_empty() {
            ROOT_PATH.to_string()
        } else {
            self.path_labels.join(PATH_SEPARATOR)
        }
    }

    pub fn render(&self) -> String {
        let lines = [
            "You help a user narrow down a category one level at a time.".to_string(),
            format!(
                "Top-level domain: {} ({}).",
                self.domain_label, self.level0
            ),
            format!("Current path: {}", self.path_display()),
            format!(
                "Propose between {} and {} options for level {}: the next, more specific sub-categories under the current path.",
                self.min_count, self.max_count, self.depth
            ),
            String::new(),
            "Rules:".to_string(),
            "- Respond with a single JSON object and nothing else. No prose, no markdown fences.".to_string(),
            "- Options must be mutually distinct and must not repeat anything already on the path.".to_string(),
            "- Each description is one short sentence.".to_string(),
            "- Each id is a deterministic lowercase slug of its label (a-z, 0-9 and '-').".to_string(),
            format!(
                "- Group the options into {} to {} semantically meaningful buckets; every bucket lists option ids from this response.",
                MIN_REQUESTED_BUCKETS, MAX_REQUESTED_BUCKETS
            ),
            "- Set can_confirm_here to true only when the current path is already specific enough to stop, and explain why in confirm_reason.".to_string(),
            String::new(),
            "Schema:".to_string(),
            r#"{"options":[{"id":string,"label":string,"description":string,"split_dimension":string,"confidence":number}],"buckets":[{"label":string,"option_ids":[string]}],"can_confirm_here":boolean,"confirm_reason":string}"#.to_string(),
        ];
        lines.join("\n")
    }
}
