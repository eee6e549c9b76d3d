//! 门户访问 - 业务能力层
//!
//! 会话驱动器需要的门户步骤：登录、进入课程、进入作业、提取详情、提交。
//! `CanvasPortal` 基于页面能力实现这些步骤。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{evaluate_as, PageDriver};
use crate::models::AssignmentRecord;
use crate::services::handlers::SUBMIT_BUTTON;

const USERNAME_INPUT: &str = "input[name=\"pseudonym_session[unique_id]\"]";
const PASSWORD_INPUT: &str = "input[name=\"pseudonym_session[password]\"]";
const LOGIN_BUTTON: &str = "button[name=\"submit\"]";
const SUBMISSION_URL_INPUT: &str = "input[name=\"submission[url]\"]";

const SCROLL_TO_BOTTOM_JS: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// 提取作业详情；标题和描述缺失时使用占位文本
const EXTRACT_ASSIGNMENT_JS: &str = r#"
(() => {
    const text = (selector, fallback) => {
        const el = document.querySelector(selector);
        return el ? el.textContent.trim() : fallback;
    };
    return {
        title: text('h1.title', 'Unknown Title'),
        description: text('div.description', 'No description available'),
        due_date: text('span.due_date', 'No due date specified'),
        completed: document.querySelector('div.submission_status.submitted') !== null,
        links: Array.from(document.querySelectorAll('a[href]'))
            .map(a => a.href)
            .filter(href => href.startsWith('http'))
    };
})()
"#;

/// 门户步骤
#[async_trait]
pub trait Portal: Send + Sync {
    async fn login(&self) -> AppResult<()>;

    async fn open_course(&self) -> AppResult<()>;

    async fn open_assignment(&self) -> AppResult<()>;

    async fn extract_assignment(&self) -> AppResult<AssignmentRecord>;

    /// 当前页面是否显示为未登录
    async fn is_logged_out(&self) -> AppResult<bool>;

    /// 提交已填写的文本
    async fn submit_text(&self) -> AppResult<()>;

    /// 以链接方式提交文档
    async fn submit_document_url(&self, url: &str) -> AppResult<()>;
}

#[derive(Debug, Deserialize)]
struct ExtractedAssignment {
    title: String,
    description: String,
    due_date: String,
    completed: bool,
    #[serde(default)]
    links: Vec<String>,
}

/// 查找文本包含 `text` 的第一个链接，返回其地址
fn find_link_script(text: &str) -> String {
    let needle = serde_json::to_string(&text.to_lowercase()).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(() => {{
    const wanted = {};
    const link = Array.from(document.querySelectorAll('a'))
        .find(a => a.textContent.trim().toLowerCase().includes(wanted));
    return link ? link.href : null;
}})()"#,
        needle
    )
}

/// 从作业页地址中取出作业编号，没有编号时用完整地址
fn assignment_id_from_url(url: &str) -> String {
    url.split("/assignments/")
        .nth(1)
        .map(|rest| {
            rest.chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
        })
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| url.to_string())
}

/// Canvas 门户
pub struct CanvasPortal {
    config: Arc<Config>,
    page: Arc<dyn PageDriver>,
}

impl CanvasPortal {
    pub fn new(config: Arc<Config>, page: Arc<dyn PageDriver>) -> Self {
        Self { config, page }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.portal_base_url.trim_end_matches('/'), path)
    }

    async fn settle(&self) {
        if self.config.settle_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.settle_delay_ms)).await;
        }
    }

    /// 点击文本匹配的链接
    async fn follow_link(&self, target: &str) -> AppResult<()> {
        let href: Option<String> = evaluate_as(self.page.as_ref(), &find_link_script(target)).await?;
        let href = href.ok_or_else(|| AppError::navigation(target, "页面上没有匹配的链接"))?;
        debug!("跳转: {} -> {}", target, href);
        self.page
            .navigate(&href)
            .await
            .map_err(|e| AppError::navigation(target, e))?;
        self.settle().await;
        Ok(())
    }
}

#[async_trait]
impl Portal for CanvasPortal {
    async fn login(&self) -> AppResult<()> {
        let login_url = self.config.login_url();
        info!("🔐 登录门户: {}", login_url);

        self.page
            .navigate(&login_url)
            .await
            .map_err(|e| AppError::Login(e.to_string()))?;
        let timeout = std::time::Duration::from_millis(self.config.element_timeout_ms);
        self.page
            .wait_for(USERNAME_INPUT, timeout)
            .await
            .map_err(|e| AppError::Login(e.to_string()))?;

        self.page.fill(USERNAME_INPUT, &self.config.username).await?;
        self.page.fill(PASSWORD_INPUT, &self.config.password).await?;
        self.page.click(LOGIN_BUTTON).await?;
        self.settle().await;

        if self.page.query(USERNAME_INPUT).await?.is_some() {
            return Err(AppError::Login("提交后仍停留在登录页".to_string()));
        }
        info!("✓ 登录成功");
        Ok(())
    }

    async fn open_course(&self) -> AppResult<()> {
        let course = &self.config.course_selector;
        info!("📚 进入课程: {}", course);
        self.page
            .navigate(&self.url("/courses"))
            .await
            .map_err(|e| AppError::navigation(course.as_str(), e))?;
        self.settle().await;
        self.follow_link(course).await
    }

    async fn open_assignment(&self) -> AppResult<()> {
        let assignment = &self.config.assignment_selector;
        info!("📝 进入作业: {}", assignment);
        // 作业列表是懒加载的
        self.page.evaluate(SCROLL_TO_BOTTOM_JS).await?;
        self.settle().await;
        self.follow_link(assignment).await
    }

    async fn extract_assignment(&self) -> AppResult<AssignmentRecord> {
        let value = self.page.evaluate(EXTRACT_ASSIGNMENT_JS).await?;
        if value.is_null() {
            return Err(AppError::Extraction("提取脚本没有返回结果".to_string()));
        }
        let extracted: ExtractedAssignment =
            serde_json::from_value(value).map_err(|e| AppError::Extraction(e.to_string()))?;
        let url = self.page.current_url().await?;

        let record = AssignmentRecord {
            id: assignment_id_from_url(&url),
            title: extracted.title,
            description: extracted.description,
            due_date_raw: extracted.due_date,
            completed: extracted.completed,
            links: extracted.links,
        };
        debug!("[作业 {}] 标题: {}", record.id, record.title);
        Ok(record)
    }

    async fn is_logged_out(&self) -> AppResult<bool> {
        if self.page.query(USERNAME_INPUT).await?.is_some() {
            return Ok(true);
        }
        let url = self.page.current_url().await?;
        Ok(url.contains(&self.config.login_path))
    }

    async fn submit_text(&self) -> AppResult<()> {
        self.page
            .click(SUBMIT_BUTTON)
            .await
            .map_err(|e| AppError::Submission(e.to_string()))?;
        self.settle().await;
        Ok(())
    }

    async fn submit_document_url(&self, url: &str) -> AppResult<()> {
        self.page
            .fill(SUBMISSION_URL_INPUT, url)
            .await
            .map_err(|e| AppError::Submission(e.to_string()))?;
        self.submit_text().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeElement, FakePage, PageAction};
    use serde_json::json;

    fn config() -> Arc<Config> {
        Arc::new(Config {
            portal_base_url: "https://lms.example.edu/".into(),
            username: "student".into(),
            password: "secret".into(),
            course_selector: "Biology 101".into(),
            assignment_selector: "Lab 2".into(),
            settle_delay_ms: 0,
            ..Config::default()
        })
    }

    #[test]
    fn test_assignment_id_from_url() {
        assert_eq!(
            assignment_id_from_url("https://lms.example.edu/courses/3/assignments/1234?x=1"),
            "1234"
        );
        assert_eq!(assignment_id_from_url("about:blank"), "about:blank");
    }

    #[test]
    fn test_find_link_script_escapes_text() {
        let script = find_link_script("Tom's \"Lab\"");
        assert!(script.contains(r#""tom's \"lab\"""#));
    }

    #[tokio::test]
    async fn test_open_course_follows_matching_link() {
        let page = FakePage::new().on_evaluate("\"biology 101\"", json!("https://lms.example.edu/courses/3"));
        let portal = CanvasPortal::new(config(), Arc::new(page.clone()));

        portal.open_course().await.unwrap();

        let navigations: Vec<PageAction> = page
            .actions()
            .into_iter()
            .filter(|a| matches!(a, PageAction::Navigate(_)))
            .collect();
        assert_eq!(
            navigations,
            vec![
                PageAction::Navigate("https://lms.example.edu/courses".into()),
                PageAction::Navigate("https://lms.example.edu/courses/3".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_link_is_navigation_error() {
        let portal = CanvasPortal::new(config(), Arc::new(FakePage::new()));
        let err = portal.open_assignment().await.unwrap_err();
        assert!(matches!(err, AppError::Navigation { .. }));
    }

    #[tokio::test]
    async fn test_extract_assignment() {
        let page = FakePage::new().on_evaluate(
            "h1.title",
            json!({
                "title": "Quiz 3",
                "description": "Take this quiz on chapter 4",
                "due_date": "2024-09-10",
                "completed": false,
                "links": ["https://docs.google.com/document/d/abc"]
            }),
        );
        page.navigate("https://lms.example.edu/courses/3/assignments/77")
            .await
            .unwrap();
        let portal = CanvasPortal::new(config(), Arc::new(page));

        let record = portal.extract_assignment().await.unwrap();
        assert_eq!(record.id, "77");
        assert_eq!(record.title, "Quiz 3");
        assert_eq!(record.document_links().len(), 1);
    }

    #[tokio::test]
    async fn test_extract_without_result_fails() {
        let portal = CanvasPortal::new(config(), Arc::new(FakePage::new()));
        let err = portal.extract_assignment().await.unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_login_fills_credentials() {
        // 登录表单在提交后仍然存在，所以视为失败
        let page = FakePage::new()
            .with_element(USERNAME_INPUT, FakeElement::new("user", ""))
            .with_element(PASSWORD_INPUT, FakeElement::new("pass", ""))
            .with_element(LOGIN_BUTTON, FakeElement::new("go", "Log In"));
        let portal = CanvasPortal::new(config(), Arc::new(page.clone()));

        let err = portal.login().await.unwrap_err();

        assert!(matches!(err, AppError::Login(_)));
        assert_eq!(page.filled(USERNAME_INPUT).as_deref(), Some("student"));
        assert_eq!(page.filled(PASSWORD_INPUT).as_deref(), Some("secret"));
        assert!(page.clicked(LOGIN_BUTTON));
        assert!(portal.is_logged_out().await.unwrap());
    }

    #[tokio::test]
    async fn test_submit_document_url() {
        let page = FakePage::new()
            .with_element(SUBMISSION_URL_INPUT, FakeElement::new("url", ""))
            .with_element(SUBMIT_BUTTON, FakeElement::new("submit", "Submit"));
        let portal = CanvasPortal::new(config(), Arc::new(page.clone()));

        portal
            .submit_document_url("https://docs.google.com/document/d/copy")
            .await
            .unwrap();

        assert_eq!(
            page.filled(SUBMISSION_URL_INPUT).as_deref(),
            Some("https://docs.google.com/document/d/copy")
        );
        assert!(page.clicked(SUBMIT_BUTTON));
    }

    #[tokio::test]
    async fn test_lost_connection_is_not_a_successful_login() {
        let page = FakePage::new()
            .with_element(USERNAME_INPUT, FakeElement::new("user", ""))
            .with_element(PASSWORD_INPUT, FakeElement::new("pass", ""))
            .with_element(LOGIN_BUTTON, FakeElement::new("login", "Log In"))
            .fail_queries();
        let portal = CanvasPortal::new(config(), Arc::new(page.clone()));

        assert!(portal.login().await.is_err());
        assert!(portal.is_logged_out().await.is_err());
    }
}
