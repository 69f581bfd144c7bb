//! Field mapping between remote pages and local records.
//!
//! Each logical field lists the remote property names it may appear under,
//! newest schema first. Outgoing pushes always write the first alias.

use super::{write, PropertyBag, PropertyMap, RemotePage};
use crate::models::{
    is_canonical_id, CaseRecord, SummonsDates, SummonsFlags, SummonsRecord, DEFAULT_CASE_STATUS,
    DEFAULT_DEPARTMENT, DEFAULT_PERSON_ROLE,
};
use crate::status::infer_status;
use crate::util::unix_millis_now;

/// Rich-text property tagging a remote page with the local id it was created from
pub const LOCAL_ID_PROPERTY: &str = "Local ID";

mod case_fields {
    pub const NAME: &[&str] = &["Case Name", "Name", "Title"];
    pub const REFERENCE: &[&str] = &["Reference No", "Reference Number", "Case Number", "File No"];
    pub const STATUS: &[&str] = &["Status", "Case Status"];
    pub const OFFICERS: &[&str] = &["Assigned Officers", "Officers", "Assigned To"];
    pub const ACTIVITY: &[&str] = &["Activity Type", "Activity Types"];
    pub const DEPARTMENT: &[&str] = &["Department", "Unit"];
    pub const AMOUNT: &[&str] = &["Amount Involved", "Amount"];
    pub const DATE_OPENED: &[&str] = &["Date Opened", "Registered On"];
    pub const ACTIVE: &[&str] = &["Active", "Is Active"];
}

mod summons_fields {
    pub const PERSON: &[&str] = &["Person Name", "Name"];
    pub const ROLE: &[&str] = &["Role", "Person Role"];
    pub const CASE: &[&str] = &["Case", "Related Case"];
    pub const PHONE: &[&str] = &["Phone", "Contact Number", "Mobile"];
    pub const EMAIL: &[&str] = &["Email", "Email Address"];
    pub const ISSUE_DATE: &[&str] = &["Issue Date", "Date of Issue"];
    pub const APPEARANCE_DATE: &[&str] = &["Appearance Date", "Date of Appearance"];
    pub const RESCHEDULED_DATE: &[&str] = &["Rescheduled Date", "New Appearance Date"];
    pub const STATEMENT_DATE: &[&str] = &["Statement Date"];
    pub const IS_ISSUED: &[&str] = &["Issued", "Is Issued"];
    pub const IS_SERVED: &[&str] = &["Served", "Is Served"];
    pub const REQUESTS_RESCHEDULE: &[&str] = &["Requests Reschedule", "Reschedule Requested"];
    pub const STATEMENT_ONGOING: &[&str] = &["Statement Ongoing"];
    pub const STATEMENT_RECORDED: &[&str] = &["Statement Recorded"];
    pub const DATE_COMMUNICATED: &[&str] = &["Rescheduled Date Communicated"];
    pub const FOLLOWUP: &[&str] = &["Follow-up Required", "Followup Required"];
    pub const NOTES: &[&str] = &["Notes", "Remarks"];
    pub const MODE_OF_SERVICE: &[&str] = &["Mode of Service", "Service Mode"];
    pub const PURPOSE: &[&str] = &["Purpose"];
    pub const PREVIOUS: &[&str] = &["Previous Summon", "Previous Summons"];
}

fn timestamps(page: &RemotePage) -> (i64, i64) {
    let now = unix_millis_now();
    let created_at = page.created_at.unwrap_or(now);
    let updated_at = page.last_edited_at.unwrap_or(created_at);
    (created_at, updated_at)
}

/// Map a remote case page into a local record.
///
/// The returned record has no `synced_at`; the reconciler stamps it on write.
#[must_use]
pub fn map_case(page: &RemotePage) -> CaseRecord {
    use self::case_fields as f;
    let bag: &PropertyBag = &page.properties;
    let (created_at, updated_at) = timestamps(page);

    CaseRecord {
        id: page.id.clone(),
        name: bag.text(f::NAME),
        reference_number: bag.text(f::REFERENCE),
        status: bag.select_or(f::STATUS, DEFAULT_CASE_STATUS),
        assigned_officers: bag.multi_select(f::OFFICERS),
        activity_types: bag.multi_select(f::ACTIVITY),
        department: bag.select_or(f::DEPARTMENT, DEFAULT_DEPARTMENT),
        amount_involved: bag.number(f::AMOUNT),
        date_opened: bag.date(f::DATE_OPENED),
        is_active: bag.checkbox(f::ACTIVE),
        created_at,
        updated_at,
        synced_at: None,
    }
}

/// Map a remote summons page into a local record, deriving its status.
#[must_use]
pub fn map_summons(page: &RemotePage) -> SummonsRecord {
    use self::summons_fields as f;
    let bag: &PropertyBag = &page.properties;
    let (created_at, updated_at) = timestamps(page);

    let flags = SummonsFlags {
        is_issued: bag.checkbox(f::IS_ISSUED),
        is_served: bag.checkbox(f::IS_SERVED),
        requests_reschedule: bag.checkbox(f::REQUESTS_RESCHEDULE),
        statement_ongoing: bag.checkbox(f::STATEMENT_ONGOING),
        statement_recorded: bag.checkbox(f::STATEMENT_RECORDED),
        rescheduled_date_communicated: bag.checkbox(f::DATE_COMMUNICATED),
        followup_required: bag.checkbox(f::FOLLOWUP),
    };
    let dates = SummonsDates {
        issue_date: bag.date(f::ISSUE_DATE),
        appearance_date: bag.date(f::APPEARANCE_DATE),
        rescheduled_date: bag.date(f::RESCHEDULED_DATE),
        statement_date: bag.date(f::STATEMENT_DATE),
    };

    SummonsRecord {
        id: page.id.clone(),
        case_id: bag.first_relation(f::CASE),
        person_name: bag.text(f::PERSON),
        person_role: bag.select_or(f::ROLE, DEFAULT_PERSON_ROLE),
        phone: bag.phone(f::PHONE),
        email: bag.email(f::EMAIL),
        status: infer_status(&flags, &dates),
        dates,
        flags,
        notes: bag.text(f::NOTES),
        mode_of_service: bag.multi_select(f::MODE_OF_SERVICE),
        purpose: bag.multi_select(f::PURPOSE),
        previous_summon_id: bag.first_relation(f::PREVIOUS),
        created_at,
        updated_at,
        synced_at: None,
    }
}

fn put(map: &mut PropertyMap, aliases: &[&str], value: serde_json::Value) {
    map.insert(aliases[0].to_string(), value);
}

/// Outgoing property map for a case
#[must_use]
pub fn case_properties(case: &CaseRecord) -> PropertyMap {
    use self::case_fields as f;
    let mut map = PropertyMap::new();
    put(&mut map, f::NAME, write::title(&case.name));
    put(&mut map, f::REFERENCE, write::rich_text(&case.reference_number));
    put(&mut map, f::STATUS, write::select(Some(case.status.as_str())));
    put(&mut map, f::OFFICERS, write::multi_select(&case.assigned_officers));
    put(&mut map, f::ACTIVITY, write::multi_select(&case.activity_types));
    put(&mut map, f::DEPARTMENT, write::select(Some(case.department.as_str())));
    put(&mut map, f::AMOUNT, write::number(case.amount_involved));
    put(&mut map, f::DATE_OPENED, write::date(case.date_opened));
    put(&mut map, f::ACTIVE, write::checkbox(case.is_active));
    map
}

/// Outgoing property map for a summons.
///
/// Relations pointing at local-pending records are left out; the remote
/// system cannot resolve them until the target has been pushed.
#[must_use]
pub fn summons_properties(summons: &SummonsRecord) -> PropertyMap {
    use self::summons_fields as f;
    let mut map = PropertyMap::new();
    put(&mut map, f::PERSON, write::title(&summons.person_name));
    put(&mut map, f::ROLE, write::select(Some(summons.person_role.as_str())));
    put(&mut map, f::PHONE, write::phone_number(&summons.phone));
    put(&mut map, f::EMAIL, write::email(&summons.email));

    put(&mut map, f::ISSUE_DATE, write::date(summons.dates.issue_date));
    put(&mut map, f::APPEARANCE_DATE, write::date(summons.dates.appearance_date));
    put(&mut map, f::RESCHEDULED_DATE, write::date(summons.dates.rescheduled_date));
    put(&mut map, f::STATEMENT_DATE, write::date(summons.dates.statement_date));

    let flags = &summons.flags;
    put(&mut map, f::IS_ISSUED, write::checkbox(flags.is_issued));
    put(&mut map, f::IS_SERVED, write::checkbox(flags.is_served));
    put(&mut map, f::REQUESTS_RESCHEDULE, write::checkbox(flags.requests_reschedule));
    put(&mut map, f::STATEMENT_ONGOING, write::checkbox(flags.statement_ongoing));
    put(&mut map, f::STATEMENT_RECORDED, write::checkbox(flags.statement_recorded));
    put(&mut map, f::DATE_COMMUNICATED, write::checkbox(flags.rescheduled_date_communicated));
    put(&mut map, f::FOLLOWUP, write::checkbox(flags.followup_required));

    put(&mut map, f::NOTES, write::rich_text(&summons.notes));
    put(&mut map, f::MODE_OF_SERVICE, write::multi_select(&summons.mode_of_service));
    put(&mut map, f::PURPOSE, write::multi_select(&summons.purpose));

    if let Some(case_id) = summons.case_id.as_deref().filter(|id| is_canonical_id(id)) {
        put(&mut map, f::CASE, write::relation(&[case_id]));
    }
    if let Some(previous) = summons
        .previous_summon_id
        .as_deref()
        .filter(|id| is_canonical_id(id))
    {
        put(&mut map, f::PREVIOUS, write::relation(&[previous]));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SummonsStatus;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    const CASE_ID: &str = "8f14e45f-ceea-467f-a0e6-6a3d9b1c2d3e";

    fn page(id: &str, properties: Value) -> RemotePage {
        RemotePage::try_from(json!({ "id": id, "properties": properties })).unwrap()
    }

    #[test]
    fn maps_case_with_aliases_and_defaults() {
        let page = page(
            CASE_ID,
            json!({
                "Name": { "type": "title", "title": [{ "plain_text": "State v. Doe" }] },
                "Case Number": { "type": "rich_text", "rich_text": [{ "plain_text": "ECIR/12/2024" }] },
                "Officers": { "type": "multi_select", "multi_select": [{ "name": "Insp. Rao" }] },
                "Amount Involved": { "type": "number", "number": 2500000.0 },
                "Active": { "type": "checkbox", "checkbox": true }
            }),
        );

        let case = map_case(&page);
        assert_eq!(case.id, CASE_ID);
        assert_eq!(case.name, "State v. Doe");
        assert_eq!(case.reference_number, "ECIR/12/2024");
        assert_eq!(case.status, DEFAULT_CASE_STATUS);
        assert_eq!(case.department, DEFAULT_DEPARTMENT);
        assert_eq!(case.assigned_officers, vec!["Insp. Rao".to_string()]);
        assert!(case.activity_types.is_empty());
        assert_eq!(case.amount_involved, Some(2_500_000.0));
        assert!(case.is_active);
        assert!(case.synced_at.is_none());
    }

    #[test]
    fn maps_empty_case_page_without_failing() {
        let case = map_case(&page(CASE_ID, json!({})));
        assert_eq!(case.name, "");
        assert!(!case.is_active);
        assert_eq!(case.date_opened, None);
    }

    #[test]
    fn maps_summons_and_derives_status() {
        let page = page(
            "5c3a1b2d-0000-4000-8000-000000000001",
            json!({
                "Person Name": { "type": "title", "title": [{ "plain_text": "R. Mehta" }] },
                "Case": { "type": "relation", "relation": [{ "id": CASE_ID }] },
                "Issued": { "type": "checkbox", "checkbox": true },
                "Served": { "type": "checkbox", "checkbox": true },
                "Appearance Date": { "type": "date", "date": { "start": "2024-03-18" } },
                "Notes": { "type": "rich_text", "rich_text": [{ "plain_text": "carry passport" }] },
                "Purpose": { "type": "multi_select", "multi_select": [{ "name": "Statement" }] }
            }),
        );

        let summons = map_summons(&page);
        assert_eq!(summons.person_name, "R. Mehta");
        assert_eq!(summons.case_id.as_deref(), Some(CASE_ID));
        assert_eq!(summons.person_role, DEFAULT_PERSON_ROLE);
        assert_eq!(summons.status, SummonsStatus::AwaitingAppearance);
        assert_eq!(
            summons.dates.appearance_date,
            NaiveDate::from_ymd_opt(2024, 3, 18)
        );
        assert_eq!(summons.notes, "carry passport");
        assert_eq!(summons.purpose, vec!["Statement".to_string()]);
        assert!(summons.previous_summon_id.is_none());
    }

    #[test]
    fn summons_push_omits_local_pending_relations() {
        let mut summons = SummonsRecord::new("R. Mehta", Some("case-1700000000000".to_string()));
        let map = summons_properties(&summons);
        assert!(!map.contains_key("Case"));

        summons.case_id = Some(CASE_ID.to_string());
        let map = summons_properties(&summons);
        assert_eq!(map["Case"], json!({ "relation": [{ "id": CASE_ID }] }));
    }

    #[test]
    fn case_properties_map_back_to_the_same_record() {
        let mut case = CaseRecord::new("State v. Doe");
        case.id = CASE_ID.to_string();
        case.reference_number = "ECIR/12/2024".to_string();
        case.assigned_officers = vec!["Insp. Rao".to_string(), "SI Khan".to_string()];
        case.date_opened = NaiveDate::from_ymd_opt(2024, 2, 1);
        case.amount_involved = Some(10.5);

        let outgoing = case_properties(&case);
        let incoming = page(CASE_ID, Value::Object(outgoing));
        let mapped = map_case(&incoming);
        assert!(mapped.same_remote_fields(&case));
    }

    #[test]
    fn summons_flags_survive_push_and_pull() {
        let mut summons = SummonsRecord::new("R. Mehta", None);
        summons.id = "5c3a1b2d-0000-4000-8000-000000000001".to_string();
        summons.flags.is_issued = true;
        summons.flags.requests_reschedule = true;
        summons.flags.followup_required = true;
        summons.refresh_status();

        let incoming = page(&summons.id, Value::Object(summons_properties(&summons)));
        let mapped = map_summons(&incoming);
        assert_eq!(mapped.flags, summons.flags);
        assert_eq!(mapped.status, SummonsStatus::Rescheduled);
    }
}
