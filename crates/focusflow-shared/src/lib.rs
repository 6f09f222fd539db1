use serde::{
  Deserialize,
  Serialize
};

pub type TaskId = u64;

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskDto {
  pub id:      TaskId,
  #[serde(default)]
  pub title:   String,
  #[serde(default)]
  pub status:  bool,
  #[serde(default)]
  pub remarks: Option<String>
}

impl TaskDto {
  pub fn has_remarks(&self) -> bool {
    self
      .remarks
      .as_deref()
      .is_some_and(|r| !r.trim().is_empty())
  }

  pub fn status_label(
    &self
  ) -> &'static str {
    if self.status {
      "Completed"
    } else {
      "Pending"
    }
  }
}

#[derive(
  Debug,
  Clone,
  Default,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TasksListArgs {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub search: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub status: Option<bool>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskCreate {
  pub title: String
}

/// Partial update for `PUT /tasks/{id}`.
/// Fields left as `None` are omitted from the body.
#[derive(
  Debug,
  Clone,
  Default,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub status:  Option<bool>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub title:   Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub remarks: Option<String>
}

impl TaskPatch {
  pub fn status(
    status: bool
  ) -> Self {
    Self {
      status: Some(status),
      ..Self::default()
    }
  }

  pub fn details(
    title: impl Into<String>,
    remarks: Option<String>
  ) -> Self {
    Self {
      title: Some(title.into()),
      remarks,
      ..Self::default()
    }
  }
}

#[derive(
  Clone, Serialize, Deserialize,
)]
pub struct Credentials {
  pub email:    String,
  pub password: String
}

impl std::fmt::Debug for Credentials {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>
  ) -> std::fmt::Result {
    f.debug_struct("Credentials")
      .field("email", &self.email)
      .field("password", &"<redacted>")
      .finish()
  }
}

#[derive(
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
  pub access_token:  String,
  pub refresh_token: String
}

impl std::fmt::Debug for AuthTokens {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>
  ) -> std::fmt::Result {
    f.debug_struct("AuthTokens")
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn task_without_remarks_decodes_as_none()
  {
    let task: TaskDto =
      serde_json::from_str(
        r#"{"id":7,"title":"Buy milk","status":false}"#
      )
      .expect("decode task");
    assert_eq!(task.id, 7);
    assert_eq!(task.remarks, None);
    assert!(!task.has_remarks());

    let task: TaskDto =
      serde_json::from_str(
        r#"{"id":8,"title":"x","status":true,"remarks":null}"#
      )
      .expect("decode null remarks");
    assert_eq!(task.remarks, None);
    assert_eq!(
      task.status_label(),
      "Completed"
    );
  }

  #[test]
  fn blank_remarks_do_not_count() {
    let task = TaskDto {
      id:      1,
      title:   "Ship".to_string(),
      status:  false,
      remarks: Some("   ".to_string())
    };
    assert!(!task.has_remarks());
  }

  #[test]
  fn toggle_patch_only_carries_status() {
    let body = serde_json::to_value(
      TaskPatch::status(true)
    )
    .expect("encode patch");
    assert_eq!(
      body,
      serde_json::json!({ "status": true })
    );
  }

  #[test]
  fn details_patch_omits_missing_remarks()
  {
    let body = serde_json::to_value(
      TaskPatch::details("Title", None)
    )
    .expect("encode patch");
    assert_eq!(
      body,
      serde_json::json!({ "title": "Title" })
    );
  }

  #[test]
  fn tokens_use_camel_case_fields() {
    let tokens: AuthTokens =
      serde_json::from_str(
        r#"{"accessToken":"acc-secret","refreshToken":"ref-secret"}"#
      )
      .expect("decode tokens");
    assert_eq!(
      tokens.access_token,
      "acc-secret"
    );
    assert_eq!(
      tokens.refresh_token,
      "ref-secret"
    );
    assert!(
      !format!("{tokens:?}")
        .contains("secret")
    );
  }
}
