//! Wire types shared by every `/api/tasks` consumer.

use std::fmt;

use chrono::NaiveDate;
use serde::{
  Deserialize,
  Deserializer,
  Serialize
};

/// Store-assigned task identifier.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
  pub fn new(
    raw: impl Into<String>
  ) -> Self {
    Self(raw.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TaskId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for TaskId {
  fn from(value: &str) -> Self {
    Self::new(value)
  }
}

impl From<String> for TaskId {
  fn from(value: String) -> Self {
    Self(value)
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(
  rename_all = "camelCase",
  try_from = "RawTask"
)]
pub struct Task {
  #[serde(rename = "_id")]
  pub id:          TaskId,
  pub assigned_to: String,
  pub status:      String,
  #[serde(
    serialize_with = "iso_date::option::serialize",
    skip_serializing_if = "Option::is_none"
  )]
  pub due_date:    Option<NaiveDate>,
  pub priority:    String,
  pub comments:    Vec<String>
}

/// Decoding shape of [`Task`]. Stored documents may carry `null` fields
/// and may repeat the key under `_id`, `identifier` and `id`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTask {
  #[serde(rename = "_id", default)]
  underscore_id: Option<TaskId>,
  #[serde(default)]
  identifier:    Option<TaskId>,
  #[serde(default)]
  id:            Option<TaskId>,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  assigned_to:   String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  status:        String,
  #[serde(
    default,
    with = "iso_date::option"
  )]
  due_date:      Option<NaiveDate>,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  priority:      String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  comments:      Vec<String>
}

impl TryFrom<RawTask> for Task {
  type Error = String;

  fn try_from(
    raw: RawTask
  ) -> Result<Self, Self::Error> {
    let id = raw
      .underscore_id
      .or(raw.identifier)
      .or(raw.id)
      .ok_or_else(|| {
        "task has no `_id`, `identifier` \
         or `id`"
          .to_string()
      })?;
    Ok(Self {
      id,
      assigned_to: raw.assigned_to,
      status: raw.status,
      due_date: raw.due_date,
      priority: raw.priority,
      comments: raw.comments
    })
  }
}

fn null_as_default<'de, D, T>(
  deserializer: D
) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de> + Default
{
  Ok(
    Option::<T>::deserialize(
      deserializer
    )?
    .unwrap_or_default()
  )
}

/// A task payload without the identifier, sent on creation.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
  pub assigned_to: String,
  pub status:      String,
  #[serde(
    default,
    with = "iso_date::option",
    skip_serializing_if = "Option::is_none"
  )]
  pub due_date:    Option<NaiveDate>,
  pub priority:    String,
  #[serde(default)]
  pub comments:    Vec<String>
}

impl TaskDraft {
  pub fn into_task(
    self,
    id: TaskId
  ) -> Task {
    Task {
      id,
      assigned_to: self.assigned_to,
      status: self.status,
      due_date: self.due_date,
      priority: self.priority,
      comments: self.comments
    }
  }
}

/// Partial update; only the fields that are `Some` go over the wire.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub assigned_to: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub status:      Option<String>,
  #[serde(
    default,
    with = "iso_date::option",
    skip_serializing_if = "Option::is_none"
  )]
  pub due_date:    Option<NaiveDate>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub priority:    Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub comments:    Option<Vec<String>>
}

impl TaskPatch {
  pub fn is_empty(&self) -> bool {
    self.assigned_to.is_none()
      && self.status.is_none()
      && self.due_date.is_none()
      && self.priority.is_none()
      && self.comments.is_none()
  }

  pub fn apply_to(
    &self,
    task: &mut Task
  ) {
    if let Some(value) =
      self.assigned_to.as_ref()
    {
      task.assigned_to = value.clone();
    }
    if let Some(value) =
      self.status.as_ref()
    {
      task.status = value.clone();
    }
    if let Some(value) = self.due_date {
      task.due_date = Some(value);
    }
    if let Some(value) =
      self.priority.as_ref()
    {
      task.priority = value.clone();
    }
    if let Some(value) =
      self.comments.as_ref()
    {
      task.comments = value.clone();
    }
  }
}

/// Dates go out as `YYYY-MM-DD`; both that and full RFC 3339 timestamps
/// are accepted on the way in.
pub mod iso_date {
  use chrono::{
    DateTime,
    NaiveDate
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub const DATE_FORMAT: &str =
    "%Y-%m-%d";

  pub fn parse(
    raw: &str
  ) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();
    if let Ok(date) =
      NaiveDate::parse_from_str(
        trimmed,
        DATE_FORMAT
      )
    {
      return Ok(date);
    }
    DateTime::parse_from_rfc3339(
      trimmed
    )
    .map(|dt| dt.date_naive())
    .map_err(|_| {
      format!(
        "invalid date '{raw}', \
         expected YYYY-MM-DD"
      )
    })
  }

  pub fn serialize<S>(
    date: &NaiveDate,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &date
        .format(DATE_FORMAT)
        .to_string()
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveDate, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    parse(&raw)
      .map_err(serde::de::Error::custom)
  }

  pub mod option {
    use chrono::NaiveDate;
    use serde::{
      Deserialize,
      Deserializer,
      Serializer
    };

    pub fn serialize<S>(
      date: &Option<NaiveDate>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match date {
        | Some(value) => {
          super::serialize(
            value, serializer
          )
        }
        | None => {
          serializer.serialize_none()
        }
      }
    }

    pub fn deserialize<'de, D>(
      deserializer: D
    ) -> Result<Option<NaiveDate>, D::Error>
    where
      D: Deserializer<'de>
    {
      let raw =
        Option::<String>::deserialize(
          deserializer
        )?;
      match raw {
        | Some(value)
          if !value.trim().is_empty() =>
        {
          super::parse(&value)
            .map(Some)
            .map_err(
              serde::de::Error::custom
            )
        }
        | _ => Ok(None)
      }
    }
  }
}
