//! Calendar events, busy times and member notices

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use va_contracts::events::{
    CreateEventContract, EventInput, MemberInput, RangeQuery, UpdateEventContract,
};
use va_contracts::Contract;
use va_core::types::day_bounds;
use va_core::{Id, Owned, VaError, VaResult};
use va_db::RepositoryError;
use va_models::naming::{derive_member_name, format_event_time};
use va_models::{BusyTime, ConcernedMember, Event, Notification, User};
use va_notifications::jobs::{CREATE_REMINDER_NOTIFICATION, DELETE_EXPIRED_EVENT, SEND_EMAIL_REMINDER};
use va_notifications::{EmailReminderArgs, ExpiredEventArgs, Job, NotificationArgs};

use crate::context::ServiceContext;

/// Event enriched with its creator, as seen by a member
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberEvent {
    #[serde(flatten)]
    pub event: Event,
    pub creator_name: Option<String>,
    pub creator_email: Option<String>,
}

/// Events the caller is invited to, plus upcoming windows
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberEvents {
    pub count: usize,
    pub events: Vec<MemberEvent>,
    pub events_in_30_minutes: Vec<MemberEvent>,
    pub events_in_24_hours: Vec<MemberEvent>,
    pub events_in_7_days: Vec<MemberEvent>,
}

impl MemberEvents {
    fn bucket(events: Vec<MemberEvent>, now: DateTime<Utc>) -> Self {
        let within = |window: Duration| {
            events
                .iter()
                .filter(|e| e.event.start_time >= now && e.event.start_time <= now + window)
                .cloned()
                .collect::<Vec<_>>()
        };
        Self {
            count: events.len(),
            events_in_30_minutes: within(Duration::minutes(30)),
            events_in_24_hours: within(Duration::hours(24)),
            events_in_7_days: within(Duration::days(7)),
            events,
        }
    }
}

pub struct EventService {
    ctx: ServiceContext,
}

impl EventService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    async fn normalize_members(&self, members: &[MemberInput]) -> VaResult<Vec<ConcernedMember>> {
        let emails: Vec<String> = members.iter().filter_map(MemberInput::email).collect();
        let users = self.ctx.stores.users.find_by_emails(&emails).await?;
        Ok(emails
            .into_iter()
            .map(|email| {
                let name = users
                    .iter()
                    .find(|u| u.email == email && !u.full_name.is_empty())
                    .map(|u| u.full_name.clone())
                    .unwrap_or_else(|| derive_member_name(&email));
                ConcernedMember { email, name }
            })
            .collect())
    }

    /// Registered users among the event's members
    async fn registered_members(&self, event: &Event) -> VaResult<Vec<User>> {
        let emails: Vec<String> = event.concerned_members.iter().map(|m| m.email.clone()).collect();
        Ok(self.ctx.stores.users.find_by_emails(&emails).await?)
    }

    async fn owned(&self, owner: Id, id: Id) -> VaResult<Option<Event>> {
        Ok(self
            .ctx
            .stores
            .events
            .find_by_id(id)
            .await?
            .filter(|e| e.is_owned_by(owner)))
    }

    async fn schedule_expiry(&self, event: &Event) {
        match Job::with_args(DELETE_EXPIRED_EVENT, &ExpiredEventArgs { event_id: event.id }) {
            Ok(job) => self.ctx.schedule(job.run_at(event.end_time)).await,
            Err(e) => tracing::warn!(error = %e, event_id = %event.id, "Failed to build expiry job"),
        }
    }

    pub async fn create(&self, owner: Id, input: EventInput) -> VaResult<Event> {
        let now = Utc::now();
        CreateEventContract::new(now).validate(&input)?;
        let (Some(start), Some(end)) = (input.start(), input.end()) else {
            return Err(VaError::invalid("Invalid date format"));
        };

        if let Some(busy) = self
            .ctx
            .stores
            .busy_times
            .find_conflict(owner, start, end, None)
            .await?
        {
            return Err(VaError::bad_request(format!(
                "Time conflict detected. Busy time: {} → {}",
                format_event_time(busy.start_time),
                format_event_time(busy.end_time)
            )));
        }

        let reminder = input.reminder_enabled();
        let event = Event {
            id: uuid::Uuid::new_v4(),
            title: input.title.clone().unwrap_or_default().trim().to_string(),
            va_name: input.va_name.clone().unwrap_or_default().trim().to_string(),
            start_time: start,
            end_time: end,
            venue: input.venue.clone().unwrap_or_default().trim().to_string(),
            concerned_members: self
                .normalize_members(input.concerned_members.as_deref().unwrap_or_default())
                .await?,
            reminder,
            reminder_time: if reminder { input.reminder_at() } else { None },
            user_id: owner,
            created_at: now,
            updated_at: now,
        };
        let event = self.ctx.stores.events.insert(event).await?;
        self.ctx.stores.busy_times.insert(BusyTime::for_event(&event)).await?;
        tracing::info!(event_id = %event.id, %owner, "Event created");

        let registered = self.registered_members(&event).await?;
        let added = format!(
            "You have been added to the event \"{}\". 🕒 {} → {} 📍 Venue: {}",
            event.title,
            format_event_time(event.start_time),
            format_event_time(event.end_time),
            event.venue
        );
        for member in &event.concerned_members {
            let user = registered.iter().find(|u| u.email == member.email);
            if let Some(user) = user {
                self.ctx.notify(user.id, added.clone()).await;
            }
            self.ctx
                .deliver(self.ctx.templates.event_invitation(&member.email, Some(&member.name), &event))
                .await;

            if let (Some(user), Some(at)) = (user, event.reminder_time) {
                self.schedule_reminders(&event, member, user.id, at).await;
            }
        }

        self.schedule_expiry(&event).await;
        Ok(event)
    }

    async fn schedule_reminders(&self, event: &Event, member: &ConcernedMember, user_id: Id, at: DateTime<Utc>) {
        let email = EmailReminderArgs {
            event_id: event.id,
            email: member.email.clone(),
            name: Some(member.name.clone()),
        };
        let notification = NotificationArgs {
            user_id,
            message: format!("Reminder: \"{}\" starts soon.", event.title),
        };
        let jobs = [
            Job::with_args(SEND_EMAIL_REMINDER, &email),
            Job::with_args(CREATE_REMINDER_NOTIFICATION, &notification),
        ];
        for job in jobs {
            match job {
                Ok(job) => self.ctx.schedule(job.run_at(at)).await,
                Err(e) => tracing::warn!(error = %e, member = %member.email, "Failed to build reminder job"),
            }
        }
    }

    /// Events overlapping the range and the owner's total event count
    pub async fn list_range(&self, owner: Id, query: &RangeQuery) -> VaResult<(Vec<Event>, usize)> {
        let (start, end) = query.bounds()?;
        let events = &self.ctx.stores.events;
        let in_range = events.list_overlapping(owner, start, end).await?;
        let total = events.list_owned(owner).await?.len();
        Ok((in_range, total))
    }

    pub async fn list(&self, owner: Id) -> VaResult<Vec<Event>> {
        Ok(self.ctx.stores.events.list_owned(owner).await?)
    }

    pub async fn get(&self, owner: Id, id: Id) -> VaResult<Event> {
        self.owned(owner, id)
            .await?
            .ok_or_else(|| VaError::not_found(format!("Event with ID {} not found or not authorized", id)))
    }

    pub async fn find_by_name(&self, owner: Id, name: &str) -> VaResult<Event> {
        self.ctx
            .stores
            .events
            .find_by_title(owner, name)
            .await?
            .ok_or_else(|| VaError::not_found(format!("Event with name {} not found", name)))
    }

    /// Events overlapping the current UTC day
    pub async fn today(&self, owner: Id) -> VaResult<Vec<Event>> {
        let (start, end) = day_bounds(Utc::now().date_naive());
        Ok(self.ctx.stores.events.list_overlapping(owner, start, end).await?)
    }

    pub async fn update(&self, owner: Id, id: Id, input: EventInput) -> VaResult<Event> {
        UpdateEventContract.validate(&input)?;
        let old = self
            .owned(owner, id)
            .await?
            .ok_or_else(|| VaError::not_found("Event not found or unauthorized"))?;

        let mut event = old.clone();
        if let Some(title) = input.title.as_deref() {
            event.title = title.trim().to_string();
        }
        if let Some(va_name) = input.va_name.as_deref() {
            event.va_name = va_name.trim().to_string();
        }
        if let Some(venue) = input.venue.as_deref() {
            event.venue = venue.trim().to_string();
        }
        if let Some(start) = input.start() {
            event.start_time = start;
        }
        if let Some(end) = input.end() {
            event.end_time = end;
        }
        if event.end_time <= event.start_time {
            return Err(VaError::invalid("End time must be after start time"));
        }
        if let Some(members) = input.concerned_members.as_deref() {
            event.concerned_members = self.normalize_members(members).await?;
        }
        event.reminder = input.reminder_enabled();
        event.reminder_time = if event.reminder {
            input.reminder_at().or(old.reminder_time)
        } else {
            None
        };
        event.updated_at = Utc::now();

        // Busy time first: its unique start key is the only write that can clash
        if let Err(e) = self.ctx.stores.busy_times.sync_with_event(&event).await {
            return Err(match e {
                RepositoryError::Conflict(_) => VaError::bad_request(format!(
                    "Time conflict detected. Another event already starts at {}",
                    format_event_time(event.start_time)
                )),
                other => other.into(),
            });
        }
        let event = match self.ctx.stores.events.update(&event).await {
            Ok(event) => event,
            Err(e) => {
                if let Err(restore) = self.ctx.stores.busy_times.sync_with_event(&old).await {
                    tracing::error!(event_id = %old.id, error = %restore, "Failed to restore busy time");
                }
                return Err(e.into());
            }
        };
        if event.end_time != old.end_time {
            self.schedule_expiry(&event).await;
        }

        let message = format!(
            "The event \"{}\" has been updated. Please check the new details.",
            old.title
        );
        let registered = self.registered_members(&event).await?;
        for member in &event.concerned_members {
            if let Some(user) = registered.iter().find(|u| u.email == member.email) {
                self.ctx.notify(user.id, message.clone()).await;
                self.ctx
                    .deliver(self.ctx.templates.event_updated(&member.email, Some(&member.name), &event))
                    .await;
            }
        }
        Ok(event)
    }

    /// Delete the event and its busy time; members hear about it only if it had not started
    pub async fn cancel(&self, owner: Id, id: Id) -> VaResult<Event> {
        let event = self
            .owned(owner, id)
            .await?
            .ok_or_else(|| VaError::not_found(format!("Event with ID {} not found or not authorized", id)))?;
        self.ctx.stores.events.delete(id).await?;
        self.ctx.stores.busy_times.delete_for_event(id).await?;
        tracing::info!(event_id = %id, "Event cancelled");

        if event.start_time <= Utc::now() {
            return Ok(event);
        }

        let message = format!(
            "The event \"{}\" scheduled on {} has been cancelled.",
            event.title,
            format_event_time(event.start_time)
        );
        let registered = self.registered_members(&event).await?;
        for member in &event.concerned_members {
            if let Some(user) = registered.iter().find(|u| u.email == member.email) {
                self.ctx.notify(user.id, message.clone()).await;
            }
            self.ctx
                .deliver(self.ctx.templates.event_cancelled(&member.email, Some(&member.name), &event))
                .await;
        }
        Ok(event)
    }

    /// The user's notifications, newest first
    pub async fn notifications(&self, user_id: Id) -> VaResult<Vec<Notification>> {
        Ok(self.ctx.stores.notifications.list_for_user(user_id).await?)
    }

    pub async fn busy_times(&self, owner: Id) -> VaResult<Vec<BusyTime>> {
        Ok(self.ctx.stores.busy_times.list_upcoming(owner, Utc::now()).await?)
    }

    /// Events where the caller's email is a concerned member
    pub async fn member_events(&self, user_id: Id) -> VaResult<MemberEvents> {
        let user = self.ctx.current_user(user_id).await?;
        let events = self.ctx.stores.events.list_by_member(&user.email).await?;

        let mut creator_ids: Vec<Id> = events.iter().map(|e| e.user_id).collect();
        creator_ids.sort();
        creator_ids.dedup();
        let creators = self.ctx.stores.users.find_by_ids(&creator_ids).await?;

        let enriched = events
            .into_iter()
            .map(|event| {
                let creator = creators.iter().find(|u| u.id == event.user_id);
                MemberEvent {
                    creator_name: creator.map(|u| u.full_name.clone()),
                    creator_email: creator.map(|u| u.email.clone()),
                    event,
                }
            })
            .collect();
        Ok(MemberEvents::bucket(enriched, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;
    use serde_json::json;

    fn at(hours: i64) -> String {
        (Utc::now() + Duration::hours(hours)).to_rfc3339()
    }

    fn event_input(value: serde_json::Value) -> EventInput {
        serde_json::from_value(value).unwrap()
    }

    fn board_meeting(start: i64, end: i64) -> EventInput {
        event_input(json!({
            "title": "Board meeting",
            "vaName": "Ada",
            "startTime": at(start),
            "endTime": at(end),
            "venue": "HQ",
            "concernedMembers": [{ "email": "Bob@Example.com" }, { "email": "mary_ann@partner.org" }],
            "reminder": "true",
            "reminderTime": at(start - 1)
        }))
    }

    #[tokio::test]
    async fn test_create_event_side_effects() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let bob = t.user("bob", "Bob Builder").await;
        let service = EventService::new(t.ctx.clone());

        let event = service.create(owner.id, board_meeting(5, 6)).await.unwrap();
        assert_eq!(event.concerned_members[0].name, "Bob Builder");
        assert_eq!(event.concerned_members[1].name, "Mary ann");
        assert!(event.reminder);

        let busy = service.busy_times(owner.id).await.unwrap();
        assert_eq!(busy.len(), 1);
        assert_eq!(busy[0].event_id, Some(event.id));

        let notes = t.ctx.stores.notifications.list_for_user(bob.id).await.unwrap();
        assert!(notes[0].message.starts_with("You have been added to the event \"Board meeting\"."));
        assert_eq!(t.emails.sent_to("mary_ann@partner.org").len(), 1);

        assert_eq!(t.jobs.of_type(SEND_EMAIL_REMINDER).await.len(), 1);
        assert_eq!(t.jobs.of_type(CREATE_REMINDER_NOTIFICATION).await.len(), 1);
        let expiry = t.jobs.of_type(DELETE_EXPIRED_EVENT).await;
        assert_eq!(expiry.len(), 1);
        assert_eq!(expiry[0].run_at, event.end_time);
    }

    #[tokio::test]
    async fn test_create_rejects_conflict_and_past_start() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let service = EventService::new(t.ctx.clone());
        service.create(owner.id, board_meeting(5, 7)).await.unwrap();

        let err = service.create(owner.id, board_meeting(6, 8)).await.unwrap_err();
        assert!(err.to_string().starts_with("Time conflict detected. Busy time: "));
        assert_eq!(err.status_code(), 400);

        let err = service.create(owner.id, board_meeting(-2, 1)).await.unwrap_err();
        assert_eq!(err.to_string(), "Event start time cannot be in the past");
    }

    #[tokio::test]
    async fn test_update_syncs_busy_time_and_notifies() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let bob = t.user("bob", "Bob Builder").await;
        let service = EventService::new(t.ctx.clone());
        let event = service.create(owner.id, board_meeting(5, 6)).await.unwrap();

        let updated = service
            .update(
                owner.id,
                event.id,
                event_input(json!({ "title": "Board sync", "endTime": at(7) })),
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Board sync");
        assert!(!updated.reminder);
        assert!(updated.reminder_time.is_none());

        let busy = service.busy_times(owner.id).await.unwrap();
        assert_eq!(busy[0].title, "Board sync");
        assert_eq!(busy[0].end_time, updated.end_time);

        let notes = t.ctx.stores.notifications.list_for_user(bob.id).await.unwrap();
        assert!(notes
            .iter()
            .any(|n| n.message == "The event \"Board meeting\" has been updated. Please check the new details."));
        assert!(t
            .emails
            .sent_to("bob@example.com")
            .iter()
            .any(|m| m.subject == "Updated Event Details: Board sync"));
        assert_eq!(t.jobs.of_type(DELETE_EXPIRED_EVENT).await.len(), 2);

        let err = service
            .update(bob.id, event.id, EventInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Event not found or unauthorized");
    }

    #[tokio::test]
    async fn test_update_onto_taken_start_leaves_event_in_place() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let service = EventService::new(t.ctx.clone());
        let a = service.create(owner.id, board_meeting(5, 6)).await.unwrap();
        let b = service.create(owner.id, board_meeting(8, 9)).await.unwrap();

        let err = service
            .update(
                owner.id,
                b.id,
                event_input(json!({ "startTime": a.start_time.to_rfc3339() })),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().starts_with("Time conflict detected."));

        let stored = t.ctx.stores.events.find_by_id(b.id).await.unwrap().unwrap();
        assert_eq!(stored.start_time, b.start_time);
        let starts: Vec<_> = service
            .busy_times(owner.id)
            .await
            .unwrap()
            .into_iter()
            .map(|busy| busy.start_time)
            .collect();
        assert_eq!(starts, vec![a.start_time, b.start_time]);
    }

    #[tokio::test]
    async fn test_cancel_future_event() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let bob = t.user("bob", "Bob Builder").await;
        let service = EventService::new(t.ctx.clone());
        let event = service.create(owner.id, board_meeting(5, 6)).await.unwrap();

        let cancelled = service.cancel(owner.id, event.id).await.unwrap();
        assert_eq!(cancelled.title, "Board meeting");
        assert!(service.busy_times(owner.id).await.unwrap().is_empty());
        assert!(t
            .emails
            .sent_to("mary_ann@partner.org")
            .iter()
            .any(|m| m.subject == "Event Cancelled: Board meeting"));
        let notes = t.ctx.stores.notifications.list_for_user(bob.id).await.unwrap();
        assert!(notes.iter().any(|n| n.message.ends_with("has been cancelled.")));

        let err = service.get(owner.id, event.id).await.unwrap_err();
        assert_eq!(err.to_string(), format!("Event with ID {} not found or not authorized", event.id));
    }

    #[tokio::test]
    async fn test_queries() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let service = EventService::new(t.ctx.clone());
        assert!(service.list(owner.id).await.unwrap().is_empty());

        service.create(owner.id, board_meeting(2, 3)).await.unwrap();
        let later = event_input(json!({
            "title": "Offsite", "vaName": "Ada", "venue": "Lake house",
            "startTime": at(24 * 10), "endTime": at(24 * 10 + 2)
        }));
        service.create(owner.id, later).await.unwrap();

        let range = RangeQuery { start: Some(at(0)), end: Some(at(12)) };
        let (events, total) = service.list_range(owner.id, &range).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(total, 2);

        let missing = RangeQuery { start: Some(at(0)), end: None };
        assert_eq!(
            service.list_range(owner.id, &missing).await.unwrap_err().to_string(),
            "Start and end dates are required"
        );

        assert_eq!(service.find_by_name(owner.id, "offsite").await.unwrap().venue, "Lake house");
        assert_eq!(service.find_by_name(owner.id, "Gala").await.unwrap_err().status_code(), 404);
    }

    #[tokio::test]
    async fn test_member_events() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let bob = t.user("bob", "Bob Builder").await;
        let service = EventService::new(t.ctx.clone());
        service.create(owner.id, board_meeting(5, 6)).await.unwrap();

        let member = service.member_events(bob.id).await.unwrap();
        assert_eq!(member.count, 1);
        assert_eq!(member.events[0].creator_name.as_deref(), Some("Olive Owner"));
        assert!(member.events_in_30_minutes.is_empty());
        assert_eq!(member.events_in_24_hours.len(), 1);
        assert_eq!(member.events_in_7_days.len(), 1);

        let value = serde_json::to_value(&member).unwrap();
        assert!(value["events"][0].get("creatorEmail").is_some());
        assert!(value["events"][0].get("_id").is_some());
    }
}
