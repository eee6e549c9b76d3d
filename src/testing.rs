//! 测试替身
//!
//! 单元测试和 `tests/` 下的集成测试共用的假页面、假模型和假门户。

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::{AppError, AppResult, BrowserError};
use crate::infrastructure::{LanguageModel, PageDriver, PageElement};
use crate::models::AssignmentRecord;
use crate::services::Portal;

/// 假页面上记录下来的一次操作
#[derive(Debug, Clone, PartialEq)]
pub enum PageAction {
    Navigate(String),
    Fill { selector: String, text: String },
    Click(String),
    ElementFill { id: String, text: String },
    ElementClick(String),
    SetInputFiles { selector: String, path: String },
    OpenPage(String),
    Evaluate(String),
}

impl PageAction {
    /// 是否向页面写入了内容
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            PageAction::Fill { .. }
                | PageAction::Click(_)
                | PageAction::ElementFill { .. }
                | PageAction::ElementClick(_)
                | PageAction::SetInputFiles { .. }
        )
    }
}

/// 假元素的描述
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub id: String,
    pub text: String,
    pub label: Option<String>,
    pub children: HashMap<String, Vec<FakeElement>>,
}

impl FakeElement {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_children(mut self, selector: &str, children: Vec<FakeElement>) -> Self {
        self.children.insert(selector.to_string(), children);
        self
    }
}

type ActionLog = Arc<Mutex<Vec<PageAction>>>;

struct BoundElement {
    template: FakeElement,
    log: ActionLog,
}

impl BoundElement {
    fn boxed(template: FakeElement, log: &ActionLog) -> Box<dyn PageElement> {
        Box::new(Self {
            template,
            log: log.clone(),
        })
    }
}

#[async_trait]
impl PageElement for BoundElement {
    async fn text(&self) -> AppResult<String> {
        Ok(self.template.text.clone())
    }

    async fn fill(&self, text: &str) -> AppResult<()> {
        self.log.lock().unwrap().push(PageAction::ElementFill {
            id: self.template.id.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn click(&self) -> AppResult<()> {
        self.log
            .lock()
            .unwrap()
            .push(PageAction::ElementClick(self.template.id.clone()));
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> AppResult<Vec<Box<dyn PageElement>>> {
        Ok(self
            .template
            .children
            .get(selector)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|child| BoundElement::boxed(child, &self.log))
            .collect())
    }

    async fn label(&self) -> AppResult<String> {
        Ok(self.template.label.clone().unwrap_or_else(|| self.template.text.clone()))
    }
}

#[derive(Default)]
struct PageState {
    elements: HashMap<String, Vec<FakeElement>>,
    evaluations: Vec<(String, JsonValue)>,
    queries_fail: bool,
}

/// 内存中的假页面
///
/// `open_page` 打开的子页面与父页面共享元素和操作记录，但有自己的 URL。
#[derive(Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<PageState>>,
    log: ActionLog,
    url: Arc<Mutex<String>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(self, url: &str) -> Self {
        *self.url.lock().unwrap() = url.to_string();
        self
    }

    /// 之后的 `query_all` / `query` 都返回协议错误，模拟连接断开
    pub fn fail_queries(self) -> Self {
        self.state.lock().unwrap().queries_fail = true;
        self
    }

    pub fn with_element(self, selector: &str, element: FakeElement) -> Self {
        self.add_element(selector, element);
        self
    }

    pub fn add_element(&self, selector: &str, element: FakeElement) {
        self.state
            .lock()
            .unwrap()
            .elements
            .entry(selector.to_string())
            .or_default()
            .push(element);
    }

    /// 脚本中包含 `fragment` 时返回 `value`
    pub fn on_evaluate(self, fragment: &str, value: JsonValue) -> Self {
        self.state
            .lock()
            .unwrap()
            .evaluations
            .push((fragment.to_string(), value));
        self
    }

    pub fn actions(&self) -> Vec<PageAction> {
        self.log.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<PageAction> {
        self.actions().into_iter().filter(PageAction::is_write).collect()
    }

    /// 按 selector 填写的文本
    pub fn filled(&self, selector: &str) -> Option<String> {
        self.actions().into_iter().find_map(|action| match action {
            PageAction::Fill { selector: s, text } if s == selector => Some(text),
            _ => None,
        })
    }

    pub fn clicked(&self, target: &str) -> bool {
        self.actions().iter().any(|action| match action {
            PageAction::Click(s) | PageAction::ElementClick(s) => s == target,
            _ => false,
        })
    }

    fn record(&self, action: PageAction) {
        self.log.lock().unwrap().push(action);
    }

    fn first(&self, selector: &str) -> Option<FakeElement> {
        self.state
            .lock()
            .unwrap()
            .elements
            .get(selector)
            .and_then(|list| list.first().cloned())
    }

    fn require(&self, selector: &str) -> AppResult<FakeElement> {
        self.first(selector)
            .ok_or_else(|| BrowserError::ElementNotFound(selector.to_string()).into())
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        *self.url.lock().unwrap() = url.to_string();
        self.record(PageAction::Navigate(url.to_string()));
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> AppResult<Box<dyn PageElement>> {
        match self.first(selector) {
            Some(template) => Ok(BoundElement::boxed(template, &self.log)),
            None => Err(BrowserError::Timeout {
                selector: selector.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }
            .into()),
        }
    }

    async fn fill(&self, selector: &str, text: &str) -> AppResult<()> {
        self.require(selector)?;
        self.record(PageAction::Fill {
            selector: selector.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        self.require(selector)?;
        self.record(PageAction::Click(selector.to_string()));
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> AppResult<JsonValue> {
        self.record(PageAction::Evaluate(script.to_string()));
        let state = self.state.lock().unwrap();
        Ok(state
            .evaluations
            .iter()
            .find(|(fragment, _)| script.contains(fragment.as_str()))
            .map(|(_, value)| value.clone())
            .unwrap_or(JsonValue::Null))
    }

    async fn query_all(&self, selector: &str) -> AppResult<Vec<Box<dyn PageElement>>> {
        let templates = {
            let state = self.state.lock().unwrap();
            if state.queries_fail {
                return Err(BrowserError::Protocol("connection closed".to_string()).into());
            }
            state.elements.get(selector).cloned().unwrap_or_default()
        };
        Ok(templates
            .into_iter()
            .map(|template| BoundElement::boxed(template, &self.log))
            .collect())
    }

    async fn current_url(&self) -> AppResult<String> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn open_page(&self, url: &str) -> AppResult<Arc<dyn PageDriver>> {
        self.record(PageAction::OpenPage(url.to_string()));
        Ok(Arc::new(FakePage {
            state: self.state.clone(),
            log: self.log.clone(),
            url: Arc::new(Mutex::new(url.to_string())),
        }))
    }

    async fn set_input_files(&self, selector: &str, path: &Path) -> AppResult<()> {
        self.require(selector)?;
        self.record(PageAction::SetInputFiles {
            selector: selector.to_string(),
            path: path.display().to_string(),
        });
        Ok(())
    }
}

/// 按脚本回答的假模型
///
/// 先匹配提示词片段规则，再按队列返回，最后返回默认回答。
pub struct ScriptedModel {
    rules: Vec<(String, String)>,
    queue: Mutex<VecDeque<Result<String, String>>>,
    default_response: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(default_response: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            queue: Mutex::new(VecDeque::new()),
            default_response: Some(default_response.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// 每次调用都失败
    pub fn failing() -> Self {
        Self {
            default_response: None,
            ..Self::new("")
        }
    }

    pub fn with_rule(mut self, prompt_fragment: &str, response: &str) -> Self {
        self.rules
            .push((prompt_fragment.to_string(), response.to_string()));
        self
    }

    pub fn then_respond(self, response: &str) -> Self {
        self.queue.lock().unwrap().push_back(Ok(response.to_string()));
        self
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.queue.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str, _max_tokens: u32, _temperature: f32) -> AppResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some((_, response)) = self
            .rules
            .iter()
            .find(|(fragment, _)| prompt.contains(fragment.as_str()))
        {
            return Ok(response.clone());
        }
        if let Some(next) = self.queue.lock().unwrap().pop_front() {
            return next.map_err(|message| AppError::generation(self.model_name(), message));
        }
        self.default_response
            .clone()
            .ok_or_else(|| AppError::generation(self.model_name(), "scripted failure"))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// 可编排失败的假门户
#[derive(Default)]
pub struct FakePortal {
    record: Mutex<AssignmentRecord>,
    /// 每个步骤还要失败的次数
    failures: Mutex<HashMap<&'static str, usize>>,
    calls: Mutex<Vec<&'static str>>,
    logged_out: Mutex<bool>,
    /// 某步失败后页面是否显示为已登出
    logout_on_failure: bool,
    submitted: Mutex<Vec<String>>,
}

impl FakePortal {
    pub fn new(record: AssignmentRecord) -> Self {
        Self {
            record: Mutex::new(record),
            ..Default::default()
        }
    }

    /// 让 `step` 接下来失败 `times` 次
    pub fn fail(self, step: &'static str, times: usize) -> Self {
        self.failures.lock().unwrap().insert(step, times);
        self
    }

    pub fn logout_on_failure(mut self) -> Self {
        self.logout_on_failure = true;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, step: &str) -> usize {
        self.calls().iter().filter(|c| **c == step).count()
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    fn step(&self, name: &'static str) -> AppResult<()> {
        self.calls.lock().unwrap().push(name);
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(name) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                if self.logout_on_failure {
                    *self.logged_out.lock().unwrap() = true;
                }
                Err(AppError::navigation(name, "scripted failure"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Portal for FakePortal {
    async fn login(&self) -> AppResult<()> {
        self.step("login")?;
        *self.logged_out.lock().unwrap() = false;
        Ok(())
    }

    async fn open_course(&self) -> AppResult<()> {
        self.step("open_course")
    }

    async fn open_assignment(&self) -> AppResult<()> {
        self.step("open_assignment")
    }

    async fn extract_assignment(&self) -> AppResult<AssignmentRecord> {
        self.step("extract_assignment")?;
        Ok(self.record.lock().unwrap().clone())
    }

    async fn is_logged_out(&self) -> AppResult<bool> {
        self.calls.lock().unwrap().push("is_logged_out");
        Ok(*self.logged_out.lock().unwrap())
    }

    async fn submit_text(&self) -> AppResult<()> {
        self.step("submit_text")?;
        self.submitted.lock().unwrap().push("text".to_string());
        Ok(())
    }

    async fn submit_document_url(&self, url: &str) -> AppResult<()> {
        self.step("submit_document_url")?;
        self.submitted.lock().unwrap().push(url.to_string());
        Ok(())
    }
}
