use serde_json::{json, Value};

use crate::envelope::ServiceReply;

/// One accepted reply, paired with the resolved path it answered.
pub struct Accepted {
    pub path: String,
    pub reply: ServiceReply,
}

/// The outcome of combining one or more accepted service replies.
///
/// A single match forwards the raw [`ServiceReply`] verbatim, the way the
/// original's `matches == 1` branch forwards its `response` unmodified
/// (`original_source/server/server_core/server_core.go`'s single-match
/// path) — the caller builds the client-facing envelope directly from it
/// so nothing beyond `value` (an `error` object, a `subscriptionId`) is
/// lost. Two or more matches have no single raw reply to forward, so they
/// are rendered as a JSON array of `{"path":P,"value":V}` objects
/// (spec.md §4.H step 6, §9 design note).
#[derive(Debug)]
pub enum Aggregated {
    Single(ServiceReply),
    Multi(Value),
}

/// Combine one or more accepted service replies into a response.
///
/// Returns `None` if `accepted` is empty — callers treat that as the
/// "no reply matched the `$data` filter" case (spec.md §4.H step 5).
pub fn aggregate(accepted: Vec<Accepted>) -> Option<Aggregated> {
    match accepted.len() {
        0 => None,
        1 => {
            let only = accepted.into_iter().next().unwrap();
            Some(Aggregated::Single(only.reply))
        }
        _ => {
            let array: Vec<Value> = accepted
                .into_iter()
                .map(|a| {
                    json!({
                        "path": a.path,
                        "value": a.reply.value.unwrap_or_default(),
                    })
                })
                .collect();
            Some(Aggregated::Multi(Value::Array(array)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(value: &str) -> ServiceReply {
        ServiceReply {
            value: Some(value.to_string()),
            rest: Default::default(),
        }
    }

    #[test]
    fn no_accepted_replies_is_none() {
        assert!(aggregate(vec![]).is_none());
    }

    #[test]
    fn single_match_is_returned_verbatim() {
        let accepted = vec![Accepted {
            path: "Vehicle.Speed".into(),
            reply: reply("42"),
        }];
        match aggregate(accepted) {
            Some(Aggregated::Single(reply)) => assert_eq!(reply.value, Some("42".to_string())),
            other => panic!("expected Aggregated::Single, got {other:?}"),
        }
    }

    #[test]
    fn single_match_preserves_subscription_id() {
        let mut rest = serde_json::Map::new();
        rest.insert("subscriptionId".into(), json!("sub-1"));
        let accepted = vec![Accepted {
            path: "Vehicle.Speed".into(),
            reply: ServiceReply {
                value: None,
                rest,
            },
        }];
        match aggregate(accepted) {
            Some(Aggregated::Single(reply)) => assert_eq!(reply.subscription_id(), Some("sub-1".to_string())),
            other => panic!("expected Aggregated::Single, got {other:?}"),
        }
    }

    #[test]
    fn single_match_preserves_service_error() {
        let mut rest = serde_json::Map::new();
        rest.insert(
            "error".into(),
            json!({"number": "404", "reason": "path-not-found", "message": "no such path"}),
        );
        let accepted = vec![Accepted {
            path: "Vehicle.Speed".into(),
            reply: ServiceReply { value: None, rest },
        }];
        match aggregate(accepted) {
            Some(Aggregated::Single(reply)) => {
                let error = reply.error().expect("error");
                assert_eq!(error.reason, "path-not-found");
            }
            other => panic!("expected Aggregated::Single, got {other:?}"),
        }
    }

    #[test]
    fn two_matches_become_a_json_array() {
        let accepted = vec![
            Accepted {
                path: "Vehicle.Cabin.Door.Row1.Left.IsOpen".into(),
                reply: reply("true"),
            },
            Accepted {
                path: "Vehicle.Cabin.Door.Row1.Right.IsOpen".into(),
                reply: reply("false"),
            },
        ];
        let got = match aggregate(accepted) {
            Some(Aggregated::Multi(value)) => value,
            other => panic!("expected Aggregated::Multi, got {other:?}"),
        };
        assert_eq!(
            got,
            json!([
                {"path": "Vehicle.Cabin.Door.Row1.Left.IsOpen", "value": "true"},
                {"path": "Vehicle.Cabin.Door.Row1.Right.IsOpen", "value": "false"},
            ])
        );
    }

    #[test]
    fn three_or_more_matches_stay_a_flat_array() {
        let accepted = (0..3)
            .map(|i| Accepted {
                path: format!("Vehicle.Leaf{i}"),
                reply: reply("x"),
            })
            .collect::<Vec<_>>();
        let got = match aggregate(accepted) {
            Some(Aggregated::Multi(value)) => value,
            other => panic!("expected Aggregated::Multi, got {other:?}"),
        };
        assert!(got.as_array().unwrap().len() == 3);
    }
}
