use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }
}

/// `12500` → `"12 500,00"`, the way the recharge journal is exported.
fn localized_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out.push_str(",00");
    out
}

/// Serial as printed on the meter, with spaces between digit groups.
fn printed_serial(n: u64) -> String {
    let digits = format!("{n:011}");
    format!("{} {} {}", &digits[..3], &digits[3..7], &digits[7..])
}

fn main() {
    let mut rng = SimpleRng::new(42);

    // (locality, meter count, centre latitude, centre longitude)
    let localities = [
        ("Bafia", 40, 4.75, 11.23),
        ("Mbalmayo", 25, 3.52, 11.50),
        ("Obala", 32, 4.17, 11.53),
        ("Ntui", 12, 4.45, 11.63),
        ("Ayos", 18, 3.90, 12.52),
    ];

    // ---- Inventory: one column per locality, ragged lengths ----
    let max_rows = localities.iter().map(|l| l.1).max().unwrap_or(0);
    let mut serials: Vec<(String, &str, f64, f64)> = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();
    let mut fields = Vec::new();

    let mut next_serial = 14_250_000_000u64;
    for &(name, count, lat, lon) in &localities {
        let mut cells: Vec<Option<String>> = Vec::with_capacity(max_rows);
        for _ in 0..count {
            next_serial += 1 + rng.below(500);
            let printed = printed_serial(next_serial);
            serials.push((printed.clone(), name, lat, lon));
            cells.push(Some(printed));
        }
        cells.resize(max_rows, None);
        fields.push(Field::new(name, DataType::Utf8, true));
        columns.push(Arc::new(StringArray::from(cells)));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns)
        .expect("Failed to create RecordBatch");

    let inventory_path = "sample_inventory.parquet";
    let file = std::fs::File::create(inventory_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    // ---- Recharges: French number format, some bad dates ----
    let recharges_path = "sample_recharges.csv";
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(recharges_path)
        .expect("Failed to create recharges file");
    wtr.write_record(["Recharge", "Montant", "Date"])
        .expect("Failed to write header");

    let mut n_recharges = 0;
    for (serial, _, _, _) in &serials {
        // roughly two meters in seven never recharge
        let count = rng.below(7).saturating_sub(1);
        for _ in 0..count {
            let amount = 500 * (1 + rng.below(60));
            let date = if rng.next_f64() < 0.03 {
                "inconnue".to_string()
            } else {
                format!(
                    "{:02}/{:02}/2025 {:02}:{:02}",
                    1 + rng.below(28),
                    1 + rng.below(6),
                    7 + rng.below(12),
                    rng.below(60)
                )
            };
            let amount = localized_amount(amount);
            wtr.write_record([serial.as_str(), amount.as_str(), date.as_str()])
                .expect("Failed to write recharge");
            n_recharges += 1;
        }
    }
    wtr.flush().expect("Failed to flush recharges");

    // ---- Locations: scattered around each locality ----
    let locations_path = "sample_locations.csv";
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(locations_path)
        .expect("Failed to create locations file");
    wtr.write_record(["Meter SN", "Latitude", "Longitude"])
        .expect("Failed to write header");
    for (serial, _, lat, lon) in &serials {
        let dlat = (rng.next_f64() - 0.5) * 0.08;
        let dlon = (rng.next_f64() - 0.5) * 0.08;
        wtr.write_record([
            serial.clone(),
            format!("{:.5}", lat + dlat).replace('.', ","),
            format!("{:.5}", lon + dlon).replace('.', ","),
        ])
        .expect("Failed to write location");
    }
    wtr.flush().expect("Failed to flush locations");

    println!(
        "Wrote {} meters to {inventory_path}, {n_recharges} recharges to {recharges_path}, \
         locations to {locations_path}",
        serials.len()
    );
    println!(
        "Run: recharge-board --inventory {inventory_path} --recharges {recharges_path} \
         --delimiter ';' --locations {locations_path}"
    );
}
