use serde::{Deserialize, Serialize};

/// 作业记录
///
/// 从渲染后的作业页面提取，之后只读。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    /// 页面上的原始截止日期文本
    pub due_date_raw: String,
    pub completed: bool,
    #[serde(default)]
    pub links: Vec<String>,
}

impl AssignmentRecord {
    /// 作业中的在线文档链接
    pub fn document_links(&self) -> Vec<String> {
        self.links
            .iter()
            .filter(|link| link.contains("docs.google.com/document"))
            .cloned()
            .collect()
    }
}

/// 作业类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentCategory {
    Quiz,
    Writing,
    AnnotatedBibliography,
    ReflectiveJournal,
    CaseStudy,
    GeneralReasoning,
    FileUpload,
    Discussion,
    PeerReview,
    GroupProject,
    Presentation,
    LabReport,
    ProblemSet,
    Unknown,
}

impl AssignmentCategory {
    /// 全部类型，按声明顺序
    pub const ALL: [AssignmentCategory; 14] = [
        AssignmentCategory::Quiz,
        AssignmentCategory::Writing,
        AssignmentCategory::AnnotatedBibliography,
        AssignmentCategory::ReflectiveJournal,
        AssignmentCategory::CaseStudy,
        AssignmentCategory::GeneralReasoning,
        AssignmentCategory::FileUpload,
        AssignmentCategory::Discussion,
        AssignmentCategory::PeerReview,
        AssignmentCategory::GroupProject,
        AssignmentCategory::Presentation,
        AssignmentCategory::LabReport,
        AssignmentCategory::ProblemSet,
        AssignmentCategory::Unknown,
    ];

    /// 类型标签
    pub fn as_tag(self) -> &'static str {
        match self {
            AssignmentCategory::Quiz => "quiz",
            AssignmentCategory::Writing => "writing",
            AssignmentCategory::AnnotatedBibliography => "annotated_bibliography",
            AssignmentCategory::ReflectiveJournal => "reflective_journal",
            AssignmentCategory::CaseStudy => "case_study",
            AssignmentCategory::GeneralReasoning => "general_reasoning",
            AssignmentCategory::FileUpload => "file_upload",
            AssignmentCategory::Discussion => "discussion",
            AssignmentCategory::PeerReview => "peer_review",
            AssignmentCategory::GroupProject => "group_project",
            AssignmentCategory::Presentation => "presentation",
            AssignmentCategory::LabReport => "lab_report",
            AssignmentCategory::ProblemSet => "problem_set",
            AssignmentCategory::Unknown => "unknown",
        }
    }

    /// 从标签解析
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.as_tag() == tag)
    }
}

impl std::fmt::Display for AssignmentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}
