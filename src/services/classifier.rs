//! 作业分类 - 业务能力层
//!
//! 按固定优先级的关键词规则把作业标题和描述映射到作业类型。
//! 规则顺序就是平局裁决顺序：例如描述里同时出现 "quiz" 和 "write" 时归为测验。

use crate::models::AssignmentCategory;

/// 一条分类规则：任一关键词出现在标题或描述中即命中
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub category: AssignmentCategory,
    pub keywords: &'static [&'static str],
}

/// 按优先级排列的规则表
pub const RULES: &[Rule] = &[
    Rule {
        category: AssignmentCategory::Quiz,
        keywords: &["quiz"],
    },
    Rule {
        category: AssignmentCategory::Writing,
        keywords: &["write", "essay", "paragraph"],
    },
    Rule {
        category: AssignmentCategory::AnnotatedBibliography,
        keywords: &["annotated bibliography", "citation analysis"],
    },
    Rule {
        category: AssignmentCategory::ReflectiveJournal,
        keywords: &["reflective journal", "personal reflection"],
    },
    Rule {
        category: AssignmentCategory::CaseStudy,
        keywords: &["case study", "analysis"],
    },
    Rule {
        category: AssignmentCategory::GeneralReasoning,
        keywords: &["general reasoning", "fallback"],
    },
    Rule {
        category: AssignmentCategory::FileUpload,
        keywords: &["file upload"],
    },
    Rule {
        category: AssignmentCategory::Discussion,
        keywords: &["discussion", "forum"],
    },
    Rule {
        category: AssignmentCategory::PeerReview,
        keywords: &["peer review"],
    },
    Rule {
        category: AssignmentCategory::GroupProject,
        keywords: &["group project", "team assignment"],
    },
    Rule {
        category: AssignmentCategory::Presentation,
        keywords: &["presentation", "slideshow"],
    },
    Rule {
        category: AssignmentCategory::LabReport,
        keywords: &["lab report"],
    },
    Rule {
        category: AssignmentCategory::ProblemSet,
        keywords: &["problem set", "worksheet"],
    },
];

/// 对作业分类，没有规则命中时返回 `Unknown`
pub fn classify(title: &str, description: &str) -> AssignmentCategory {
    let title = title.to_lowercase();
    let description = description.to_lowercase();

    RULES
        .iter()
        .find(|rule| {
            rule.keywords
                .iter()
                .any(|kw| description.contains(kw) || title.contains(kw))
        })
        .map(|rule| rule.category)
        .unwrap_or(AssignmentCategory::Unknown)
}
