//! 测验
//!
//! 流程：开始/继续测验 → 访问码（如有）→ 滚动加载题目 → 逐题生成答案并按输入形态填写 → 提交。

use std::collections::HashSet;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use super::{finish, AssignmentHandler, SUBMIT_BUTTON};
use crate::error::{AppError, AppResult};
use crate::infrastructure::PageElement;
use crate::models::{AssignmentCategory, AssignmentRecord, CompletionResult};
use crate::workflow::SessionContext;

/// 开始或继续测验的控件，按顺序取第一个存在的
const START_CONTROLS: [&str; 3] = ["#take_quiz_link", "button.start-quiz", "button.resume-quiz"];
const ACCESS_CODE_INPUT: &str = "input[placeholder=\"Access Code\"]";
const ACCESS_CODE_SUBMIT: &str = "button.submit-access-code";
const QUESTION: &str = ".question";

const TEXT_INPUT: &str = "input[type=\"text\"]";
const RADIO_INPUT: &str = "input[type=\"radio\"]";
const TEXTAREA: &str = "textarea";

const SCROLL_TO_BOTTOM_JS: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// 题目的作答形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerShape {
    TextBox,
    SingleSelect,
    MultiLine,
    Unsupported,
}

impl AnswerShape {
    fn selector(self) -> Option<&'static str> {
        match self {
            AnswerShape::TextBox => Some(TEXT_INPUT),
            AnswerShape::SingleSelect => Some(RADIO_INPUT),
            AnswerShape::MultiLine => Some(TEXTAREA),
            AnswerShape::Unsupported => None,
        }
    }
}

fn word_pattern() -> Option<&'static Regex> {
    static WORDS: OnceLock<Option<Regex>> = OnceLock::new();
    WORDS.get_or_init(|| Regex::new(r"\w+").ok()).as_ref()
}

/// 小写词集合，去掉标点
fn tokens(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    match word_pattern() {
        Some(re) => re.find_iter(&lower).map(|m| m.as_str().to_string()).collect(),
        None => lower.split_whitespace().map(str::to_string).collect(),
    }
}

/// 选出与答案词集合重叠最多的选项
///
/// 只有严格更高的分数才会替换当前最佳，所以平局保留先出现的选项；
/// 所有选项得分为 0 时返回 None。
pub fn pick_best_option<S: AsRef<str>>(options: &[S], answer: &str) -> Option<usize> {
    let answer_tokens = tokens(answer);
    let mut best: Option<usize> = None;
    let mut best_score = 0;

    for (index, option) in options.iter().enumerate() {
        let score = tokens(option.as_ref()).intersection(&answer_tokens).count();
        if score > best_score {
            best_score = score;
            best = Some(index);
        }
    }
    best
}

pub struct QuizHandler;

impl QuizHandler {
    async fn detect_shape(question: &dyn PageElement) -> AppResult<AnswerShape> {
        for shape in [AnswerShape::TextBox, AnswerShape::SingleSelect, AnswerShape::MultiLine] {
            if let Some(selector) = shape.selector() {
                if !question.query_all(selector).await?.is_empty() {
                    return Ok(shape);
                }
            }
        }
        Ok(AnswerShape::Unsupported)
    }

    async fn start(ctx: &SessionContext) -> AppResult<()> {
        for selector in START_CONTROLS {
            if let Some(control) = ctx.page.query(selector).await? {
                debug!("点击测验入口: {}", selector);
                control.click().await?;
                ctx.settle().await;
                return Ok(());
            }
        }
        debug!("未找到开始/继续按钮，假定测验已打开");
        Ok(())
    }

    async fn enter_access_code(ctx: &SessionContext) -> AppResult<()> {
        let Some(input) = ctx.page.query(ACCESS_CODE_INPUT).await? else {
            return Ok(());
        };
        let code = ctx
            .config
            .quiz_access_code
            .as_deref()
            .ok_or_else(|| AppError::fill(ACCESS_CODE_INPUT, "测验需要访问码，但未配置 QUIZ_ACCESS_CODE"))?;

        input.fill(code).await?;
        if let Some(button) = ctx.page.query(ACCESS_CODE_SUBMIT).await? {
            button.click().await?;
        }
        ctx.settle().await;
        Ok(())
    }

    /// 回答一道题，返回是否作答
    async fn answer(
        record: &AssignmentRecord,
        index: usize,
        question: &dyn PageElement,
        ctx: &SessionContext,
    ) -> AppResult<bool> {
        let text = question.text().await?;
        let shape = Self::detect_shape(question).await?;
        if shape == AnswerShape::Unsupported {
            warn!("[作业 {}] ⚠️ 第 {} 题的作答形态不支持，跳过", record.id, index + 1);
            return Ok(false);
        }

        let answer = ctx.generate(&format!("Quiz question: {}", text.trim())).await?;

        match shape {
            AnswerShape::TextBox | AnswerShape::MultiLine => {
                let selector = shape.selector().unwrap_or(TEXTAREA);
                let inputs = question.query_all(selector).await?;
                let input = inputs
                    .first()
                    .ok_or_else(|| AppError::fill(selector, "输入框消失"))?;
                input.fill(&answer).await?;
                Ok(true)
            }
            AnswerShape::SingleSelect => {
                let options = question.query_all(RADIO_INPUT).await?;
                let mut labels = Vec::with_capacity(options.len());
                for option in &options {
                    labels.push(option.label().await?);
                }
                match pick_best_option(&labels, &answer) {
                    Some(best) => {
                        debug!("[作业 {}] 第 {} 题选择: {}", record.id, index + 1, labels[best]);
                        options[best].click().await?;
                        Ok(true)
                    }
                    None => {
                        warn!("[作业 {}] ⚠️ 第 {} 题没有与答案重叠的选项", record.id, index + 1);
                        Ok(false)
                    }
                }
            }
            AnswerShape::Unsupported => Ok(false),
        }
    }

    async fn run(&self, record: &AssignmentRecord, ctx: &SessionContext) -> AppResult<String> {
        Self::start(ctx).await?;
        Self::enter_access_code(ctx).await?;

        ctx.page.evaluate(SCROLL_TO_BOTTOM_JS).await?;
        ctx.settle().await;

        let questions = ctx.page.query_all(QUESTION).await?;
        info!("[作业 {}] 📦 共 {} 道题", record.id, questions.len());

        let mut answered = 0;
        for (index, question) in questions.iter().enumerate() {
            if Self::answer(record, index, question.as_ref(), ctx).await? {
                answered += 1;
            }
        }

        if let Some(submit) = ctx.page.query(SUBMIT_BUTTON).await? {
            submit
                .click()
                .await
                .map_err(|e| AppError::Submission(e.to_string()))?;
        }

        Ok(format!("Answered {} of {} questions", answered, questions.len()))
    }
}

#[async_trait]
impl AssignmentHandler for QuizHandler {
    fn category(&self) -> AssignmentCategory {
        AssignmentCategory::Quiz
    }

    fn submits_on_completion(&self) -> bool {
        true
    }

    async fn complete(&self, record: &AssignmentRecord, ctx: &SessionContext) -> CompletionResult {
        let outcome = self.run(record, ctx).await;
        finish(AssignmentCategory::Quiz, record, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::CompletionStatus;
    use crate::testing::{FakeElement, FakePage, PageAction, ScriptedModel};
    use std::sync::Arc;

    fn ctx(page: &FakePage, model: ScriptedModel, config: Config) -> SessionContext {
        let config = Config {
            settle_delay_ms: 0,
            ..config
        };
        SessionContext::new(Arc::new(config), Arc::new(page.clone()), Arc::new(model)).with_cache(None)
    }

    fn radio_question() -> FakeElement {
        FakeElement::new("q1", "What is the capital of France?").with_children(
            RADIO_INPUT,
            vec![
                FakeElement::new("opt-paris", "").with_label("Paris"),
                FakeElement::new("opt-lima", "").with_label("Lima"),
                FakeElement::new("opt-rome", "").with_label("Rome"),
            ],
        )
    }

    fn record() -> AssignmentRecord {
        AssignmentRecord {
            id: "q".into(),
            title: "Quiz 3".into(),
            description: "Take this quiz on chapter 4".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pick_best_option_strips_punctuation() {
        let options = ["Paris", "Lima", "Rome"];
        assert_eq!(
            pick_best_option(&options, "The answer is Paris, the capital of France"),
            Some(0)
        );
    }

    #[test]
    fn test_pick_best_option_ties_keep_first() {
        let options = ["red apple", "green apple", "apple pie"];
        assert_eq!(pick_best_option(&options, "an apple"), Some(0));
    }

    #[test]
    fn test_pick_best_option_no_overlap() {
        let options = ["Lima", "Rome"];
        assert_eq!(pick_best_option(&options, "Paris"), None);
        assert_eq!(pick_best_option::<&str>(&[], "Paris"), None);
    }

    #[tokio::test]
    async fn test_single_select_clicks_best_option_and_submits() {
        let page = FakePage::new()
            .with_element("#take_quiz_link", FakeElement::new("start", "Take the Quiz"))
            .with_element(QUESTION, radio_question())
            .with_element(SUBMIT_BUTTON, FakeElement::new("submit", "Submit Quiz"));
        let model = ScriptedModel::new("The answer is Paris, the capital of France");

        let result = QuizHandler
            .complete(&record(), &ctx(&page, model, Config::default()))
            .await;

        assert_eq!(result.status, CompletionStatus::Completed);
        assert_eq!(result.message, "Answered 1 of 1 questions");
        assert_eq!(
            page.writes(),
            vec![
                PageAction::ElementClick("start".into()),
                PageAction::ElementClick("opt-paris".into()),
                PageAction::ElementClick("submit".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_text_and_textarea_questions_are_filled() {
        let page = FakePage::new()
            .with_element(
                QUESTION,
                FakeElement::new("q1", "Name a prime")
                    .with_children(TEXT_INPUT, vec![FakeElement::new("short", "")]),
            )
            .with_element(
                QUESTION,
                FakeElement::new("q2", "Explain primes")
                    .with_children(TEXTAREA, vec![FakeElement::new("long", "")]),
            )
            .with_element(QUESTION, FakeElement::new("q3", "Drag the labels"));
        let model = ScriptedModel::new("fallback")
            .with_rule("Name a prime", "7")
            .with_rule("Explain primes", "Numbers with two divisors");

        let result = QuizHandler
            .complete(&record(), &ctx(&page, model, Config::default()))
            .await;

        assert_eq!(result.message, "Answered 2 of 3 questions");
        assert_eq!(
            page.writes(),
            vec![
                PageAction::ElementFill {
                    id: "short".into(),
                    text: "7".into()
                },
                PageAction::ElementFill {
                    id: "long".into(),
                    text: "Numbers with two divisors".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_access_code_gate() {
        let page = FakePage::new()
            .with_element(ACCESS_CODE_INPUT, FakeElement::new("code", ""))
            .with_element(ACCESS_CODE_SUBMIT, FakeElement::new("code-submit", "Submit"));
        let config = Config {
            quiz_access_code: Some("1234".into()),
            ..Config::default()
        };

        let result = QuizHandler
            .complete(&record(), &ctx(&page, ScriptedModel::new("x"), config))
            .await;

        assert_eq!(result.status, CompletionStatus::Completed);
        assert_eq!(
            page.writes(),
            vec![
                PageAction::ElementFill {
                    id: "code".into(),
                    text: "1234".into()
                },
                PageAction::ElementClick("code-submit".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_access_code_fails() {
        let page = FakePage::new().with_element(ACCESS_CODE_INPUT, FakeElement::new("code", ""));

        let result = QuizHandler
            .complete(&record(), &ctx(&page, ScriptedModel::new("x"), Config::default()))
            .await;

        assert_eq!(result.status, CompletionStatus::Failed);
        assert!(page.writes().is_empty());
    }

    #[tokio::test]
    async fn test_lost_connection_fails_instead_of_answering_nothing() {
        let page = FakePage::new()
            .with_element(QUESTION, radio_question())
            .fail_queries();

        let result = QuizHandler
            .complete(&record(), &ctx(&page, ScriptedModel::new("Paris"), Config::default()))
            .await;

        assert_eq!(result.status, CompletionStatus::Failed);
        assert!(page.writes().is_empty());
    }
}
