//! Property-based tests for the verification flow
//!
//! Each case serves a random staff table from memory and walks one full
//! conversation against it.

use crate::{
    EmployeeRecord, Event, Messages, Outcome, Reply, SessionManager, VerificationError,
    VerificationFlow, VerificationSettings,
};
use proptest::prelude::*;
use proptest::sample::Index;
use staffcheck_core::SessionKey;
use staffcheck_integration::InMemoryConnector;
use std::future::Future;

const KEY: SessionKey = SessionKey::new(42, 7);

// ============================================================================
// Test Helpers
// ============================================================================

#[derive(Debug, Clone)]
struct Employee {
    id: String,
    phone: String,
    status: String,
    extra: Vec<String>,
}

impl Employee {
    fn row(&self) -> Vec<String> {
        let mut row = vec![self.id.clone(), self.phone.clone(), self.status.clone()];
        row.extend(self.extra.iter().cloned());
        row
    }
}

fn connector(staff: &[Employee]) -> InMemoryConnector {
    let mut rows = vec![vec![
        "ID".to_string(),
        "Phone".to_string(),
        "Status".to_string(),
    ]];
    rows.extend(staff.iter().map(Employee::row));
    InMemoryConnector::new(rows)
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

/// Sends `/start` followed by `inputs` until the conversation ends.
///
/// Returns every reply and the number of sessions left open.
fn converse(staff: &[Employee], inputs: &[String]) -> (Vec<Reply>, usize) {
    block_on(async {
        let flow = VerificationFlow::new(connector(staff));
        let mut replies = vec![flow.handle(KEY, Event::Start).await.expect("start reply")];

        for input in inputs {
            let reply = flow
                .handle(KEY, Event::text(input.as_str()))
                .await
                .expect("step reply");
            let done = reply.outcome.is_terminal();
            replies.push(reply);
            if done {
                break;
            }
        }

        let live = flow.sessions().len().await.unwrap();
        (replies, live)
    })
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_status() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("مسموح".to_string()),
        Just(" مسموح ".to_string()),
        Just("مرفوض".to_string()),
        "[a-z]{1,8}",
    ]
}

fn arb_staff() -> impl Strategy<Value = Vec<Employee>> {
    proptest::collection::hash_set("[1-9][0-9]{0,5}", 1..8)
        .prop_flat_map(|ids| {
            let ids: Vec<String> = ids.into_iter().collect();
            let fields = proptest::collection::vec(
                (
                    "0[0-9]{3,9}",
                    arb_status(),
                    proptest::collection::vec("[A-Za-z]{1,10}", 0..4),
                ),
                ids.len(),
            );
            (Just(ids), fields)
        })
        .prop_map(|(ids, fields)| {
            ids.into_iter()
                .zip(fields)
                .map(|(id, (phone, status, extra))| Employee {
                    id,
                    phone,
                    status,
                    extra,
                })
                .collect()
        })
}

fn padded(text: &str, pad: &str) -> String {
    format!("{pad}{text}{pad}")
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_unknown_id_is_not_found(
        staff in arb_staff(),
        id in "[1-9][0-9]{6,8}",
        pad in " {0,2}",
    ) {
        let (replies, live) = converse(&staff, &[padded(&id, &pad)]);

        prop_assert_eq!(replies.len(), 2);
        prop_assert_eq!(&replies[0].outcome, &Outcome::AwaitingId);
        prop_assert_eq!(
            &replies[1].outcome,
            &Outcome::Failed(VerificationError::RecordNotFound)
        );
        prop_assert_eq!(&replies[1].text, &Messages::default().id_not_found);
        prop_assert_eq!(live, 0);
    }

    #[test]
    fn prop_differing_phone_is_a_mismatch_whatever_the_status(
        staff in arb_staff(),
        pick in any::<Index>(),
        suffix in "[0-9]{1,3}",
    ) {
        let employee = pick.get(&staff);
        let wrong_phone = format!("{}{suffix}", employee.phone);

        let (replies, live) = converse(&staff, &[employee.id.clone(), wrong_phone]);

        prop_assert_eq!(replies.len(), 3);
        prop_assert_eq!(&replies[1].outcome, &Outcome::AwaitingPhone);
        prop_assert_eq!(
            &replies[2].outcome,
            &Outcome::Failed(VerificationError::FieldMismatch)
        );
        prop_assert_eq!(&replies[2].text, &Messages::default().phone_mismatch);
        prop_assert_eq!(live, 0);
    }

    #[test]
    fn prop_status_decides_access(
        staff in arb_staff(),
        pick in any::<Index>(),
        pad in " {0,2}",
    ) {
        let employee = pick.get(&staff);
        let messages = Messages::default();

        let (replies, live) = converse(
            &staff,
            &[padded(&employee.id, &pad), padded(&employee.phone, &pad)],
        );

        prop_assert_eq!(replies.len(), 3);
        prop_assert_eq!(live, 0);

        if VerificationSettings::default().is_allowed(&employee.status) {
            let expected = EmployeeRecord {
                id: employee.id.clone(),
                phone: employee.phone.clone(),
                status: employee.status.clone(),
                extra: employee.extra.clone(),
            };
            prop_assert_eq!(&replies[2].outcome, &Outcome::Verified(expected));

            let extra = if employee.extra.is_empty() {
                messages.no_extra_fields.clone()
            } else {
                employee.extra.join(&messages.extra_separator)
            };
            let lines: Vec<&str> = replies[2].text.lines().collect();
            prop_assert_eq!(
                lines,
                vec![
                    messages.summary_title.clone(),
                    String::new(),
                    format!("{} {}", messages.id_label, employee.id),
                    format!("{} {}", messages.phone_label, employee.phone),
                    format!("{} {}", messages.status_label, employee.status),
                    format!("{} {}", messages.extra_label, extra),
                ]
            );
        } else {
            prop_assert_eq!(
                &replies[2].outcome,
                &Outcome::Failed(VerificationError::AccessDenied)
            );
            prop_assert_eq!(&replies[2].text, &messages.contact_administrator);
        }
    }
}
