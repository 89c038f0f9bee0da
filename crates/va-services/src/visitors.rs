//! Visitor log with calendar views and retention purge

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use va_contracts::visitors::{CreateVisitorContract, UpdateVisitorContract, VisitorInput};
use va_contracts::Contract;
use va_core::types::day_bounds;
use va_core::{Id, Owned, VaError, VaResult};
use va_models::visitor::retention_cutoff;
use va_models::Visitor;

use crate::context::ServiceContext;

pub struct VisitorService {
    ctx: ServiceContext,
}

/// First instant of `month` in `year` (month is 1-based)
fn month_start(year: i32, month: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}

fn month_bounds(year: i32, month: u32) -> VaResult<(DateTime<Utc>, DateTime<Utc>)> {
    let invalid = || VaError::bad_request("Invalid month");
    let start = month_start(year, month).ok_or_else(invalid)?;
    let end = if month == 12 {
        month_start(year + 1, 1)
    } else {
        month_start(year, month + 1)
    }
    .ok_or_else(invalid)?;
    Ok((start, end))
}

/// Sunday-to-Sunday week containing `now`
fn week_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let sunday = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
    let (start, _) = day_bounds(sunday);
    (start, start + Duration::days(7))
}

impl VisitorService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, owner: Id, input: VisitorInput) -> VaResult<Visitor> {
        CreateVisitorContract.validate(&input)?;
        let visitor = Visitor {
            id: uuid::Uuid::new_v4(),
            name: input.name.unwrap_or_default().trim().to_string(),
            email: input.email.unwrap_or_default().trim().to_lowercase(),
            phone: input.phone.unwrap_or_default().trim().to_string(),
            message: input.message.filter(|m| !m.trim().is_empty()),
            user_id: owner,
            created_at: Utc::now(),
        };
        let visitor = self.ctx.stores.visitors.insert(visitor).await?;
        tracing::info!(visitor_id = %visitor.id, %owner, "Visitor logged");
        Ok(visitor)
    }

    pub async fn update(&self, owner: Id, id: Id, input: VisitorInput) -> VaResult<Visitor> {
        UpdateVisitorContract.validate(&input)?;
        let mut visitor = self
            .ctx
            .stores
            .visitors
            .find_by_id(id)
            .await?
            .filter(|v| v.is_owned_by(owner))
            .ok_or_else(|| VaError::not_found("Visitor not found or not authorized"))?;

        if let Some(name) = input.name {
            visitor.name = name.trim().to_string();
        }
        if let Some(email) = input.email {
            visitor.email = email.trim().to_lowercase();
        }
        if let Some(phone) = input.phone {
            visitor.phone = phone.trim().to_string();
        }
        if let Some(message) = input.message {
            visitor.message = Some(message).filter(|m| !m.trim().is_empty());
        }
        Ok(self.ctx.stores.visitors.update(&visitor).await?)
    }

    pub async fn list(&self, owner: Id) -> VaResult<Vec<Visitor>> {
        Ok(self.ctx.stores.visitors.list_owned(owner).await?)
    }

    pub async fn get(&self, owner: Id, id: Id) -> VaResult<Visitor> {
        self.ctx
            .stores
            .visitors
            .find_by_id(id)
            .await?
            .filter(|v| v.is_owned_by(owner))
            .ok_or_else(|| VaError::not_found("Visitor with the specified ID not found"))
    }

    pub async fn delete(&self, owner: Id, id: Id) -> VaResult<()> {
        self.get(owner, id).await?;
        self.ctx.stores.visitors.delete(id).await?;
        Ok(())
    }

    pub async fn find_by_name(&self, owner: Id, name: &str) -> VaResult<Vec<Visitor>> {
        let name = name.trim();
        let found = self.ctx.stores.visitors.search_name(owner, name).await?;
        if found.is_empty() {
            return Err(VaError::not_found(format!("No visitor found with name \"{name}\"")));
        }
        Ok(found)
    }

    /// Visitors logged on a `YYYY-MM-DD` calendar day
    pub async fn on_day(&self, owner: Id, raw: &str) -> VaResult<Vec<Visitor>> {
        let day = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| VaError::bad_request("Invalid date format. Use YYYY-MM-DD"))?;
        let (start, end) = day_bounds(day);
        Ok(self.ctx.stores.visitors.list_created_between(owner, start, end).await?)
    }

    /// Visitors logged in a month (1-12) of the current year
    pub async fn in_month(&self, owner: Id, month: u32) -> VaResult<Vec<Visitor>> {
        if !(1..=12).contains(&month) {
            return Err(VaError::bad_request("Invalid month"));
        }
        let (start, end) = month_bounds(Utc::now().year(), month)?;
        Ok(self.ctx.stores.visitors.list_created_between(owner, start, end).await?)
    }

    pub async fn this_week(&self, owner: Id) -> VaResult<Vec<Visitor>> {
        let (start, end) = week_bounds(Utc::now());
        Ok(self.ctx.stores.visitors.list_created_between(owner, start, end).await?)
    }

    /// Drop visitor records past the retention window; returns how many went
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> VaResult<u64> {
        let removed = self
            .ctx
            .stores
            .visitors
            .purge_created_before(retention_cutoff(now))
            .await?;
        if removed > 0 {
            tracing::info!(removed, "Purged expired visitors");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;
    use chrono::Weekday;

    fn guest(name: &str) -> VisitorInput {
        VisitorInput {
            name: Some(name.into()),
            email: Some(format!("{}@guests.org", name.to_lowercase())),
            phone: Some("+254700000000".into()),
            message: Some("Here for the board meeting".into()),
        }
    }

    #[tokio::test]
    async fn test_crud_and_search() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let service = VisitorService::new(t.ctx.clone());

        let visitor = service.create(owner.id, guest("Gary")).await.unwrap();
        assert_eq!(service.list(owner.id).await.unwrap().len(), 1);
        assert_eq!(service.find_by_name(owner.id, "gar").await.unwrap().len(), 1);

        let err = service.find_by_name(owner.id, "Zed").await.unwrap_err();
        assert_eq!(err.to_string(), "No visitor found with name \"Zed\"");

        let updated = service
            .update(
                owner.id,
                visitor.id,
                VisitorInput { phone: Some("0711".into()), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone, "0711");
        assert_eq!(updated.name, "Gary");

        let stranger = t.user("stranger", "Sam Stranger").await;
        let err = service.update(stranger.id, visitor.id, guest("X")).await.unwrap_err();
        assert_eq!(err.to_string(), "Visitor not found or not authorized");

        service.delete(owner.id, visitor.id).await.unwrap();
        let err = service.get(owner.id, visitor.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Visitor with the specified ID not found");
    }

    #[tokio::test]
    async fn test_calendar_views() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let service = VisitorService::new(t.ctx.clone());
        service.create(owner.id, guest("Today")).await.unwrap();

        let now = Utc::now();
        let today = now.format("%Y-%m-%d").to_string();
        assert_eq!(service.on_day(owner.id, &today).await.unwrap().len(), 1);
        assert!(service.on_day(owner.id, "2001-01-01").await.unwrap().is_empty());
        assert_eq!(service.on_day(owner.id, "01/02/2001").await.unwrap_err().status_code(), 400);

        assert_eq!(service.in_month(owner.id, now.month()).await.unwrap().len(), 1);
        assert_eq!(service.in_month(owner.id, 13).await.unwrap_err().status_code(), 400);
        assert_eq!(service.this_week(owner.id).await.unwrap().len(), 1);
    }

    #[test]
    fn test_week_starts_on_sunday() {
        let wednesday = Utc.with_ymd_and_hms(2030, 4, 3, 15, 0, 0).unwrap();
        let (start, end) = week_bounds(wednesday);
        assert_eq!(start.weekday(), Weekday::Sun);
        assert_eq!(start, Utc.with_ymd_and_hms(2030, 3, 31, 0, 0, 0).unwrap());
        assert_eq!(end - start, Duration::days(7));

        let (start, end) = month_bounds(2030, 12).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2030, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let service = VisitorService::new(t.ctx.clone());
        let old = service.create(owner.id, guest("Old")).await.unwrap();
        service.create(owner.id, guest("New")).await.unwrap();

        let mut aged = old.clone();
        aged.created_at = Utc::now() - Duration::days(91);
        t.ctx.stores.visitors.update(&aged).await.unwrap();

        assert_eq!(service.purge_expired(Utc::now()).await.unwrap(), 1);
        let left = service.list(owner.id).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name, "New");
    }
}
