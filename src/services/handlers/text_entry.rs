//! 文本类作业
//!
//! 写作、讨论、实验报告等类型的流程完全相同，只有提示词前缀、目标输入框和
//! 是否需要点击提交不同，这些差异放在一张静态表里。

use async_trait::async_trait;
use phf::phf_map;
use tracing::debug;

use super::{finish, AssignmentHandler};
use crate::error::{AppError, AppResult};
use crate::models::{AssignmentCategory, AssignmentRecord, CompletionResult};
use crate::workflow::SessionContext;

pub const SUBMIT_BUTTON: &str = "button[type=\"submit\"]";

const SUBMISSION_BODY: &str = "textarea[name=\"submission[body]\"]";

/// 一种文本类作业的参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextEntryProfile {
    pub prompt_prefix: &'static str,
    pub selector: &'static str,
    /// 填写后是否点击提交/发布
    pub click_submit: bool,
}

/// 按类型标签索引
static TEXT_ENTRY_TABLE: phf::Map<&'static str, TextEntryProfile> = phf_map! {
    "writing" => TextEntryProfile {
        prompt_prefix: "Writing assignment: ",
        selector: SUBMISSION_BODY,
        click_submit: false,
    },
    "annotated_bibliography" => TextEntryProfile {
        prompt_prefix: "Create an annotated bibliography for: ",
        selector: SUBMISSION_BODY,
        click_submit: false,
    },
    "reflective_journal" => TextEntryProfile {
        prompt_prefix: "Write a reflective journal for: ",
        selector: SUBMISSION_BODY,
        click_submit: false,
    },
    "case_study" => TextEntryProfile {
        prompt_prefix: "Analyze the case study: ",
        selector: SUBMISSION_BODY,
        click_submit: false,
    },
    "general_reasoning" => TextEntryProfile {
        prompt_prefix: "Analyze and complete the following assignment using agentic reasoning: ",
        selector: SUBMISSION_BODY,
        click_submit: false,
    },
    "discussion" => TextEntryProfile {
        prompt_prefix: "Discussion assignment: ",
        selector: "textarea[name=\"message\"]",
        click_submit: true,
    },
    "peer_review" => TextEntryProfile {
        prompt_prefix: "Write a peer review for: ",
        selector: "textarea[name=\"review_comment\"]",
        click_submit: true,
    },
    "group_project" => TextEntryProfile {
        prompt_prefix: "Create a project plan for: ",
        selector: "textarea[name=\"group_submission\"]",
        click_submit: true,
    },
    "presentation" => TextEntryProfile {
        prompt_prefix: "Create a presentation outline for: ",
        selector: "textarea[name=\"presentation_notes\"]",
        click_submit: true,
    },
    "lab_report" => TextEntryProfile {
        prompt_prefix: "Write a lab report for: ",
        selector: "textarea[name=\"lab_report\"]",
        click_submit: true,
    },
    "problem_set" => TextEntryProfile {
        prompt_prefix: "Solve the problem set: ",
        selector: "textarea[name=\"problem_set_solutions\"]",
        click_submit: true,
    },
};

/// 由表驱动的文本类处理例程
#[derive(Debug, Clone, Copy)]
pub struct TextEntryHandler {
    category: AssignmentCategory,
    profile: TextEntryProfile,
}

impl TextEntryHandler {
    /// 表中没有该类型时返回 None
    pub fn for_category(category: AssignmentCategory) -> Option<Self> {
        TEXT_ENTRY_TABLE
            .get(category.as_tag())
            .map(|profile| Self { category, profile: *profile })
    }

    /// 表中所有类型的例程
    pub fn all() -> Vec<Self> {
        AssignmentCategory::ALL
            .into_iter()
            .filter_map(Self::for_category)
            .collect()
    }

    pub fn profile(&self) -> &TextEntryProfile {
        &self.profile
    }

    fn build_prompt(&self, record: &AssignmentRecord) -> String {
        format!("{}{}", self.profile.prompt_prefix, record.description)
    }

    async fn run(&self, record: &AssignmentRecord, ctx: &SessionContext) -> AppResult<String> {
        let prompt = self.build_prompt(record);
        debug!("[作业 {}] 提示词: {}", record.id, prompt);

        let content = ctx.generate(&prompt).await?;

        let target = ctx
            .page
            .wait_for(self.profile.selector, ctx.element_timeout())
            .await
            .map_err(|e| AppError::fill(self.profile.selector, e))?;
        target
            .fill(&content)
            .await
            .map_err(|e| AppError::fill(self.profile.selector, e))?;

        if self.profile.click_submit {
            ctx.page
                .click(SUBMIT_BUTTON)
                .await
                .map_err(|e| AppError::Submission(e.to_string()))?;
            return Ok(format!("{} posted", self.category));
        }

        Ok(format!("{} filled", self.category))
    }
}

#[async_trait]
impl AssignmentHandler for TextEntryHandler {
    fn category(&self) -> AssignmentCategory {
        self.category
    }

    fn submits_on_completion(&self) -> bool {
        self.profile.click_submit
    }

    async fn complete(&self, record: &AssignmentRecord, ctx: &SessionContext) -> CompletionResult {
        let outcome = self.run(record, ctx).await;
        finish(self.category, record, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::CompletionStatus;
    use crate::testing::{FakeElement, FakePage, PageAction, ScriptedModel};
    use std::sync::Arc;

    fn ctx(page: &FakePage, model: Arc<ScriptedModel>) -> SessionContext {
        SessionContext::new(Arc::new(Config::default()), Arc::new(page.clone()), model).with_cache(None)
    }

    fn record() -> AssignmentRecord {
        AssignmentRecord {
            id: "7".into(),
            title: "Forum".into(),
            description: "Discuss the reading".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_table_covers_text_categories_only() {
        let categories: Vec<AssignmentCategory> =
            TextEntryHandler::all().iter().map(|h| h.category()).collect();
        assert_eq!(categories.len(), 11);
        assert!(!categories.contains(&AssignmentCategory::Quiz));
        assert!(!categories.contains(&AssignmentCategory::FileUpload));
        assert!(!categories.contains(&AssignmentCategory::Unknown));
    }

    #[tokio::test]
    async fn test_discussion_fills_message_and_posts() {
        let page = FakePage::new()
            .with_element("textarea[name=\"message\"]", FakeElement::new("message", ""))
            .with_element(SUBMIT_BUTTON, FakeElement::new("post", "Post"));
        let model = Arc::new(ScriptedModel::new("My thoughts on the reading"));
        let handler = TextEntryHandler::for_category(AssignmentCategory::Discussion).unwrap();

        let result = handler.complete(&record(), &ctx(&page, model.clone())).await;

        assert_eq!(result.status, CompletionStatus::Completed);
        assert_eq!(model.prompts(), vec!["Discussion assignment: Discuss the reading"]);
        assert_eq!(
            page.writes(),
            vec![
                PageAction::ElementFill {
                    id: "message".into(),
                    text: "My thoughts on the reading".into()
                },
                PageAction::Click(SUBMIT_BUTTON.into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_field_is_fill_failure() {
        let page = FakePage::new();
        let handler = TextEntryHandler::for_category(AssignmentCategory::LabReport).unwrap();

        let result = handler
            .complete(&record(), &ctx(&page, Arc::new(ScriptedModel::new("x"))))
            .await;

        assert_eq!(result.status, CompletionStatus::Failed);
        assert!(result.message.contains("lab_report"));
        assert!(page.writes().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_writes_nothing() {
        let page = FakePage::new().with_element(SUBMISSION_BODY, FakeElement::new("body", ""));
        let handler = TextEntryHandler::for_category(AssignmentCategory::Writing).unwrap();

        let result = handler
            .complete(&record(), &ctx(&page, Arc::new(ScriptedModel::failing())))
            .await;

        assert_eq!(result.status, CompletionStatus::Failed);
        assert!(page.writes().is_empty());
    }
}
