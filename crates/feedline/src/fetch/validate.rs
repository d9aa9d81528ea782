use crate::{Error, FetchRequest, Result, TimelineRecord};

/// Checks a raw page against the request it answers.
///
/// # Errors
///
/// Returns [`Error::MalformedPage`] if the page holds more than `limit`
/// records, is not strictly descending, or contains an id outside the
/// requested direction.
pub fn validate_page<R: TimelineRecord>(request: &FetchRequest, records: &[R]) -> Result<()> {
    if records.len() > request.limit {
        return Err(Error::MalformedPage {
            reason: format!(
                "{} records returned for a limit of {}",
                records.len(),
                request.limit
            ),
        });
    }
    if let Some(pair) = records.windows(2).find(|w| w[0].id() <= w[1].id()) {
        return Err(Error::MalformedPage {
            reason: format!(
                "ids not strictly descending: {} then {}",
                pair[0].id(),
                pair[1].id()
            ),
        });
    }
    if let Some(record) = records
        .iter()
        .find(|record| !request.direction.admits(record.id()))
    {
        return Err(Error::MalformedPage {
            reason: format!("id {} outside {}", record.id(), request.direction),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FetchDirection, OrderedId};

    struct Rec(OrderedId);

    impl TimelineRecord for Rec {
        fn id(&self) -> &OrderedId {
            &self.0
        }
    }

    fn recs(ids: &[u64]) -> Vec<Rec> {
        ids.iter().map(|&n| Rec(n.into())).collect()
    }

    fn request(direction: FetchDirection, limit: usize) -> FetchRequest {
        FetchRequest::new(direction, limit)
    }

    #[test]
    fn accepts_well_formed_pages() {
        let latest = request(FetchDirection::Latest, 3);
        assert!(validate_page(&latest, &recs(&[9, 5, 1])).is_ok());
        assert!(validate_page(&latest, &recs(&[])).is_ok());

        let before = request(FetchDirection::Before(10_u64.into()), 3);
        assert!(validate_page(&before, &recs(&[9, 8])).is_ok());
    }

    #[test]
    fn rejects_oversized_page() {
        let err = validate_page(&request(FetchDirection::Latest, 2), &recs(&[3, 2, 1])).unwrap_err();
        assert!(matches!(err, Error::MalformedPage { .. }));
    }

    #[test]
    fn rejects_unordered_or_duplicate_ids() {
        let latest = request(FetchDirection::Latest, 5);
        assert!(validate_page(&latest, &recs(&[1, 2])).is_err());
        assert!(validate_page(&latest, &recs(&[2, 2])).is_err());
    }

    #[test]
    fn rejects_ids_outside_direction() {
        let before = request(FetchDirection::Before(10_u64.into()), 5);
        assert!(validate_page(&before, &recs(&[10, 9])).is_err());

        let after = request(FetchDirection::After(10_u64.into()), 5);
        assert!(validate_page(&after, &recs(&[12, 11])).is_ok());
        let err = validate_page(&after, &recs(&[11, 10])).unwrap_err();
        assert_eq!(
            err,
            Error::MalformedPage {
                reason: "id 10 outside after 10".to_string()
            }
        );
    }
}
