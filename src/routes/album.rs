use askama::Template;
use axum::extract::State;

use crate::db::models::Event;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::routes::home::Html;
use crate::state::AppState;
use crate::view;

pub struct AlbumPhoto {
    pub url: String,
    pub event_id: String,
    pub event_title: String,
    pub date: String,
}

#[derive(Template)]
#[template(path = "pages/album.html")]
pub struct AlbumTemplate {
    pub signed_in: bool,
    pub photos: Vec<AlbumPhoto>,
}

/// One tile per photo, newest event first, upload order within an event.
fn flatten(events: Vec<Event>) -> Vec<AlbumPhoto> {
    events
        .into_iter()
        .flat_map(|event| {
            let date = view::date_label(event.date);
            let (id, title) = (event.id, event.title);
            event.photos.into_iter().map(move |url| AlbumPhoto {
                url,
                event_id: id.clone(),
                event_title: title.clone(),
                date: date.clone(),
            })
        })
        .collect()
}

pub async fn album_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
) -> AppResult<Html<AlbumTemplate>> {
    let events = state.store.list_events_with_photos().await?;

    Ok(Html(AlbumTemplate {
        signed_in: maybe_user.signed_in(),
        photos: flatten(events),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn flatten_keeps_event_then_upload_order() {
        let events = vec![
            Event {
                id: "new".into(),
                title: "Natal".into(),
                date: NaiveDate::from_ymd_opt(2025, 12, 24).unwrap(),
                description: None,
                photos: vec!["/uploads/new/1-a.jpg".into(), "/uploads/new/2-b.jpg".into()],
            },
            Event {
                id: "old".into(),
                title: "Páscoa".into(),
                date: NaiveDate::from_ymd_opt(2025, 4, 20).unwrap(),
                description: None,
                photos: vec!["/uploads/old/1-c.jpg".into()],
            },
        ];

        let photos = flatten(events);
        let urls: Vec<_> = photos.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            ["/uploads/new/1-a.jpg", "/uploads/new/2-b.jpg", "/uploads/old/1-c.jpg"]
        );
        assert_eq!(photos[2].event_title, "Páscoa");
        assert_eq!(photos[2].date, "20/04/2025");
    }
}
