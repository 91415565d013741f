use std::sync::Arc;

use anyhow::{Result, bail};
use serde_json::json;
use shema_api::ApiClient;
use shema_core::{ScheduleFilter, TimeRange, Weekday};
use shema_service::RegistrationService;

use crate::print_json;

pub(crate) async fn run_courses(api: Arc<ApiClient>, instrument: Option<&str>) -> Result<()> {
    let catalog = RegistrationService::new(api).catalog().await?;
    let Some(instrument) = instrument else {
        return print_json(&json!({ "instruments": catalog.instruments() }));
    };

    let levels = catalog.levels(instrument);
    let class_types = catalog.class_types(instrument);
    if levels.is_empty() && class_types.is_empty() {
        bail!("no courses for instrument {instrument}");
    }
    print_json(&json!({
        "instrument": instrument,
        "levels": levels,
        "class_types": class_types,
    }))
}

pub(crate) async fn run_instructors(
    api: Arc<ApiClient>,
    instrument: Option<&str>,
    class_type: Option<&str>,
) -> Result<()> {
    let options = RegistrationService::new(api).schedule_options().await?;
    let filter = ScheduleFilter::new(instrument, class_type);
    print_json(&options.instructors_for(&filter))
}

/// Narrows day, then time range, then room for one instructor.
pub(crate) async fn run_slots(
    api: Arc<ApiClient>,
    instructor_id: &str,
    filter: ScheduleFilter<'_>,
    day: Option<&str>,
    time: Option<&str>,
) -> Result<()> {
    let options = RegistrationService::new(api).schedule_options().await?;
    let Some(instructor) = options.instructor(instructor_id) else {
        bail!("unknown instructor {instructor_id}");
    };

    let Some(day) = day else {
        let days: Vec<&str> =
            options.slots.days(instructor_id, &filter).into_iter().map(Weekday::display_name).collect();
        return print_json(&json!({ "instructor": instructor.name, "days": days }));
    };
    let day: Weekday = day.parse()?;

    match time {
        None => print_json(&json!({
            "instructor": instructor.name,
            "day": day.display_name(),
            "times": options.slots.times(instructor_id, day),
        })),
        Some(time) => {
            let time = time.parse::<TimeRange>()?.to_string();
            print_json(&json!({
                "instructor": instructor.name,
                "day": day.display_name(),
                "time": time,
                "rooms": options.slots.rooms(instructor_id, day, &time),
            }))
        },
    }
}
