use std::fmt;
use std::str::FromStr;

use focusflow_shared::TasksListArgs;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Completed => "completed",
            Self::Pending => "pending",
        }
    }

    /// Value of the `status` request parameter; `None` means omit it.
    pub fn as_status_param(self) -> Option<bool> {
        match self {
            Self::All => None,
            Self::Completed => Some(true),
            Self::Pending => Some(false),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "completed" | "done" => Ok(Self::Completed),
            "pending" => Ok(Self::Pending),
            other => Err(ClientError::validation(format!(
                "unknown status filter '{other}' (expected all, completed or pending)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub search_text: String,
    pub status_filter: StatusFilter,
}

impl Query {
    pub fn to_list_args(&self) -> TasksListArgs {
        TasksListArgs {
            search: (!self.search_text.is_empty()).then(|| self.search_text.clone()),
            status: self.status_filter.as_status_param(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_sends_no_parameters() {
        assert_eq!(Query::default().to_list_args(), TasksListArgs::default());
    }

    #[test]
    fn pending_filter_without_search() {
        let query = Query {
            search_text: String::new(),
            status_filter: StatusFilter::Pending,
        };
        let args = query.to_list_args();
        assert_eq!(args.status, Some(false));
        assert_eq!(args.search, None);
    }

    #[test]
    fn completed_filter_with_search() {
        let query = Query {
            search_text: "milk".to_string(),
            status_filter: StatusFilter::Completed,
        };
        let args = query.to_list_args();
        assert_eq!(args.status, Some(true));
        assert_eq!(args.search.as_deref(), Some("milk"));
    }

    #[test]
    fn parse_filter_names() {
        assert_eq!("ALL".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!(" pending ".parse::<StatusFilter>(), Ok(StatusFilter::Pending));
        assert_eq!("completed".parse::<StatusFilter>(), Ok(StatusFilter::Completed));
        assert!("later".parse::<StatusFilter>().is_err());
    }
}
