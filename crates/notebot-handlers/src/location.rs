// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTML fragments for shared locations and venues.

use notebot_core::payload::{Location, Venue};

pub fn map_url(point: Location) -> String {
    format!(
        "https://maps.google.com/maps?q={:.6},{:.6}",
        point.latitude, point.longitude
    )
}

fn link(url: &str) -> String {
    format!("<a href='{url}'>{url}</a>")
}

/// A map link, preceded by the venue's title and address when there is one.
pub fn location_html(point: Location, venue: Option<&Venue>) -> String {
    let map = link(&map_url(point));
    let Some(venue) = venue else {
        return map;
    };
    let mut html = format!("{}<br />{}<br />{map}", venue.title, venue.address);
    if let Some(id) = venue.foursquare_id.as_deref().filter(|id| !id.is_empty()) {
        html.push_str("<br />");
        html.push_str(&link(&format!("https://foursquare.com/v/{id}")));
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINT: Location = Location {
        latitude: 55.75,
        longitude: 37.616667,
    };

    #[test]
    fn plain_location_is_a_map_link() {
        assert_eq!(
            location_html(POINT, None),
            "<a href='https://maps.google.com/maps?q=55.750000,37.616667'>\
             https://maps.google.com/maps?q=55.750000,37.616667</a>"
        );
    }

    #[test]
    fn venue_adds_title_address_and_foursquare() {
        let venue = Venue {
            location: POINT,
            title: "Red Square".into(),
            address: "Moscow".into(),
            foursquare_id: Some("4b0f".into()),
        };
        let html = location_html(POINT, Some(&venue));
        assert!(html.starts_with("Red Square<br />Moscow<br /><a href='https://maps.google.com"));
        assert!(html.ends_with(
            "<br /><a href='https://foursquare.com/v/4b0f'>https://foursquare.com/v/4b0f</a>"
        ));
    }

    #[test]
    fn venue_without_foursquare_id_has_no_extra_link() {
        let venue = Venue {
            location: POINT,
            title: "Home".into(),
            address: "Street 1".into(),
            foursquare_id: None,
        };
        assert!(!location_html(POINT, Some(&venue)).contains("foursquare"));
    }
}
