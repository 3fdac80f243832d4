//! Plan generation.
//!
//! The cycle only needs "task text in, plan document out". The shipped
//! `TemplatePlanner` fills a fixed checklist; a model-backed planner can
//! implement the same trait.

use crate::error::Result;

/// Input to a planner
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub task_id: String,
    pub title: String,
    /// Full text of the Note artifact
    pub source_text: String,
}

pub trait Planner: Send {
    /// Render a complete plan document. The first line must be a `# `
    /// heading.
    fn plan(&self, request: &PlanRequest) -> Result<String>;

    fn name(&self) -> &str;
}

/// Static action-plan template
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplatePlanner;

impl Planner for TemplatePlanner {
    fn plan(&self, request: &PlanRequest) -> Result<String> {
        let title = request.title.trim();
        Ok(format!(
            "# Action Plan: {title}

## Summary
This plan was generated based on the email titled \"{title}\".

## Tasks
1. [ ] Task 1 - Description of first action item
2. [ ] Task 2 - Description of second action item
3. [ ] Task 3 - Description of third action item

## Timeline
- Priority: Medium
- Due Date: Within 24-48 hours

## Resources Needed
- Access to relevant documents
- Team member consultation if required

## Dependencies
- Previous related tasks completion
- Availability of required resources

## Success Criteria
- [ ] All action items completed
- [ ] Stakeholders notified of completion
- [ ] Follow-up scheduled if needed
"
        ))
    }

    fn name(&self) -> &str {
        "template"
    }
}
