use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub label: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub failed: usize,
    pub failed_labels: Vec<String>,
    pub results: Vec<JobResult>,
    pub started: String,
    pub finished: String,
}

impl RunSummary {
    pub fn from_results(results: Vec<JobResult>, started: String, finished: String) -> Self {
        let failed_labels: Vec<String> = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.label.clone())
            .collect();
        Self {
            total: results.len(),
            failed: failed_labels.len(),
            failed_labels,
            results,
            started,
            finished,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn render_text(&self) -> String {
        let rule = "=================================";
        let mut out = String::new();
        out.push_str(rule);
        out.push('\n');
        out.push_str(&format!("= jobs: {}; failed: {}\n", self.total, self.failed));
        if self.all_succeeded() {
            out.push_str("= all succeeded\n");
        } else {
            out.push_str(&format!("= failed jobs: {:?}\n", self.failed_labels));
        }
        out.push_str(rule);
        out
    }
}
