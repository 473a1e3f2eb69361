use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// The `~thread` decorator. `thid` correlates messages of one protocol run,
/// `pthid` ties the run back to the invitation that triggered it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct Thread {
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thid: Option<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pthid: Option<String>,
}
