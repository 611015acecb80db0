//! Request-charge accounting.

use common::RequestCharge;

/// Cost table used by the in-memory store to report request charges.
///
/// Writes scale with document size; queries pay for every document they
/// scan, which makes cross-partition scans visibly more expensive than
/// point reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeModel {
    pub write_base: f64,
    pub write_per_byte: f64,
    pub point_read: f64,
    pub query_base: f64,
    pub query_per_scanned: f64,
    pub query_per_returned: f64,
}

impl ChargeModel {
    pub fn write(&self, document_bytes: usize) -> RequestCharge {
        RequestCharge::new(self.write_base + self.write_per_byte * document_bytes as f64)
    }

    pub fn point_read(&self) -> RequestCharge {
        RequestCharge::new(self.point_read)
    }

    pub fn query_page(&self, scanned: usize, returned: usize) -> RequestCharge {
        RequestCharge::new(
            self.query_base
                + self.query_per_scanned * scanned as f64
                + self.query_per_returned * returned as f64,
        )
    }
}

impl Default for ChargeModel {
    fn default() -> Self {
        Self {
            write_base: 10.0,
            write_per_byte: 0.01,
            point_read: 1.0,
            query_base: 2.5,
            query_per_scanned: 0.05,
            query_per_returned: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_cost_grows_with_size() {
        let model = ChargeModel::default();
        assert_eq!(model.write(0).units(), 10.0);
        assert!(model.write(500) > model.write(100));
    }

    #[test]
    fn query_page_cost() {
        let model = ChargeModel::default();
        let charge = model.query_page(100, 10);
        assert!((charge.units() - 8.5).abs() < 1e-9);
    }
}
