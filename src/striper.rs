use crate::document::{Row, Stripe};

/// Reassigns alternating stripes to the visible rows, in their current order.
/// Hidden rows are skipped and do not advance the alternation.
pub fn apply_striping(rows: &mut [Row]) {
    for (idx, row) in rows.iter_mut().filter(|r| !r.hidden).enumerate() {
        row.stripe = Some(if idx % 2 == 0 { Stripe::Even } else { Stripe::Odd });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_rows_do_not_count() {
        let mut rows: Vec<Row> = (0..4).map(|_| Row::default()).collect();
        rows[1].hidden = true;
        apply_striping(&mut rows);

        assert_eq!(rows[0].stripe, Some(Stripe::Even));
        assert_eq!(rows[1].stripe, None);
        assert_eq!(rows[2].stripe, Some(Stripe::Odd));
        assert_eq!(rows[3].stripe, Some(Stripe::Even));
    }

    #[test]
    fn hidden_rows_keep_previous_stripe() {
        let mut rows: Vec<Row> = (0..3).map(|_| Row::default()).collect();
        apply_striping(&mut rows);
        rows[0].hidden = true;
        apply_striping(&mut rows);

        assert_eq!(rows[0].stripe, Some(Stripe::Even));
        assert_eq!(rows[1].stripe, Some(Stripe::Even));
        assert_eq!(rows[2].stripe, Some(Stripe::Odd));
        assert_eq!(rows[1].stripe.map(|s| s.class_name()), Some("bg-light"));
    }
}
