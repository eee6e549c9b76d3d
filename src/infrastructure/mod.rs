//! 基础设施层
//!
//! 持有稀缺资源（浏览器页面、LLM 客户端），只暴露能力。

pub mod cdp_page;
pub mod llm;
pub mod page;

pub use cdp_page::{CdpElement, CdpPage};
pub use llm::{LanguageModel, OpenAiModel};
pub use page::{evaluate_as, PageDriver, PageElement};
