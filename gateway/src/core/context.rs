//! Company profile store and the per-call snapshot taken from it.

use arc_swap::ArcSwap;
use std::sync::Arc;

/// Fallback used in persona instructions when no company name is set.
pub const FALLBACK_COMPANY_NAME: &str = "our company";

/// Fallback used in persona instructions when no knowledge summary is set.
pub const FALLBACK_KNOWLEDGE_SUMMARY: &str = "No specific product knowledge provided.";

/// Company details editable through the HTTP API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyProfile {
    pub company_name: Option<String>,
    pub knowledge_summary: Option<String>,
}

impl CompanyProfile {
    pub fn new(company_name: Option<String>, knowledge_summary: Option<String>) -> Self {
        Self {
            company_name,
            knowledge_summary,
        }
    }
}

/// Process-wide company profile.
///
/// Writers publish a whole new profile; readers take an `Arc` to whichever
/// profile was current. A snapshot never changes after it is taken.
pub struct CompanyStore {
    profile: ArcSwap<CompanyProfile>,
}

impl CompanyStore {
    pub fn new(initial: CompanyProfile) -> Self {
        Self {
            profile: ArcSwap::from_pointee(initial),
        }
    }

    pub fn snapshot(&self) -> Arc<CompanyProfile> {
        self.profile.load_full()
    }

    pub fn set_company_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.profile.rcu(|current| CompanyProfile {
            company_name: Some(name.clone()),
            ..CompanyProfile::clone(current)
        });
    }

    pub fn set_knowledge_summary(&self, summary: impl Into<String>) {
        let summary = summary.into();
        self.profile.rcu(|current| CompanyProfile {
            knowledge_summary: Some(summary.clone()),
            ..CompanyProfile::clone(current)
        });
    }

    pub fn replace(&self, profile: CompanyProfile) {
        self.profile.store(Arc::new(profile));
    }
}

impl Default for CompanyStore {
    fn default() -> Self {
        Self::new(CompanyProfile::default())
    }
}

/// Immutable configuration for one call, fixed when its session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub call_sid: String,
    pub persona_name: String,
    pub company_name: Option<String>,
    pub knowledge_summary: Option<String>,
}

impl CallContext {
    /// Snapshot `profile` for the call `call_sid`.
    pub fn from_profile(
        call_sid: impl Into<String>,
        persona_name: impl Into<String>,
        profile: &CompanyProfile,
    ) -> Self {
        Self {
            call_sid: call_sid.into(),
            persona_name: persona_name.into(),
            company_name: profile.company_name.clone(),
            knowledge_summary: profile.knowledge_summary.clone(),
        }
    }

    /// System instructions for the agent persona.
    pub fn instructions(&self) -> String {
        let company = non_blank(self.company_name.as_deref()).unwrap_or(FALLBACK_COMPANY_NAME);
        let knowledge =
            non_blank(self.knowledge_summary.as_deref()).unwrap_or(FALLBACK_KNOWLEDGE_SUMMARY);

        format!(
            "You are an AI voice calling agent named {persona} from {company}. \
             Your goal is to engage the user, briefly introduce the services based on the \
             following summary, understand their needs, and ultimately try to book a \
             follow-up demo call. Keep responses concise and conversational for a voice call.\n\n\
             Knowledge Summary:\n{knowledge}",
            persona = self.persona_name,
        )
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
