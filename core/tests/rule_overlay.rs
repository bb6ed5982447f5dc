//! Rule overlay: escalate-only business rules over the original values.

use fraud_detector_core::{
    config::RuleConfig,
    rules::{OverlayRule, RowFacts, RuleOverlay},
    stats::percentile,
    types::{Label, LABEL_NORMAL, LABEL_SUSPICIOUS},
    TransactionTable,
};

const HEADER: &str =
    "valor,tempo_empresa_anos,tipo_transacao,segmento,pico_horario_transacoes,porte_empresa";

fn overlay() -> RuleOverlay {
    RuleOverlay::new(RuleConfig::default())
}

fn table_from(rows: &[(f64, f64)]) -> TransactionTable {
    let mut csv = format!("{HEADER}\n");
    for (valor, tempo) in rows {
        csv.push_str(&format!("{valor},{tempo},pix,varejo,manha,pequena\n"));
    }
    TransactionTable::from_reader(csv.as_bytes()).expect("parse csv")
}

fn table_with_times(rows: &[(f64, &str)]) -> TransactionTable {
    let mut csv = format!("{HEADER},data_hora\n");
    for (valor, ts) in rows {
        csv.push_str(&format!("{valor},5,pix,varejo,manha,pequena,{ts}\n"));
    }
    TransactionTable::from_reader(csv.as_bytes()).expect("parse csv")
}

fn zeros(n: usize) -> Vec<Label> {
    vec![LABEL_NORMAL; n]
}

// ─────────────────────────────────────────────────────────────────────────────
// R1: extreme value
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn r1_flags_every_row_above_p99() {
    let rows: Vec<(f64, f64)> = (1..=100).map(|v| (v as f64, 5.0)).collect();
    let t = table_from(&rows);
    let out = overlay().apply(&t, &zeros(t.len())).unwrap();

    let valores: Vec<f64> = rows.iter().map(|r| r.0).collect();
    let p99 = percentile(&valores, 99.0).unwrap();
    assert_eq!(out.thresholds.extreme_value, Some(p99));

    for (i, &(valor, _)) in rows.iter().enumerate() {
        let expected = if valor > p99 { LABEL_SUSPICIOUS } else { LABEL_NORMAL };
        assert_eq!(out.labels[i], expected, "row {i} valor={valor} p99={p99}");
    }
    assert_eq!(out.hit_count(OverlayRule::ExtremeValue), 1);
}

#[test]
fn r1_does_not_fire_when_all_values_equal() {
    let t = table_from(&[(250.0, 5.0); 30]);
    let out = overlay().apply(&t, &zeros(30)).unwrap();
    assert!(out.labels.iter().all(|&l| l == LABEL_NORMAL));
}

// ─────────────────────────────────────────────────────────────────────────────
// R2: new business + high value
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn r2_requires_both_young_business_and_p90_amount() {
    // valores 10, 20, ..., 200 -> p90 = 181, p99 = 198.1
    let mut rows: Vec<(f64, f64)> = (1..=20).map(|k| (k as f64 * 10.0, 5.0)).collect();
    rows[16].1 = 0.5; // 170: young but below p90
    rows[17].1 = 1.0; // 180: young but below p90
    rows[18].1 = 1.9; // 190: young and above p90 -> R2
    let t = table_from(&rows);
    let out = overlay().apply(&t, &zeros(t.len())).unwrap();

    assert_eq!(out.hits[18], vec![OverlayRule::NewBusinessHighValue]);
    assert_eq!(out.labels[18], LABEL_SUSPICIOUS);
    assert!(out.hits[16].is_empty());
    assert!(out.hits[17].is_empty());

    // 200 is above p99 but the business is old: R1 only.
    assert_eq!(out.hits[19], vec![OverlayRule::ExtremeValue]);
}

#[test]
fn r2_boundary_two_years_is_not_new() {
    let mut rows: Vec<(f64, f64)> = (1..=20).map(|k| (k as f64 * 10.0, 5.0)).collect();
    rows[18].1 = 2.0;
    let t = table_from(&rows);
    let out = overlay().apply(&t, &zeros(t.len())).unwrap();
    assert!(!out.hits[18].contains(&OverlayRule::NewBusinessHighValue));
}

// ─────────────────────────────────────────────────────────────────────────────
// R3: nighttime + fixed amount
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn r3_nighttime_window_and_amount() {
    let t = table_with_times(&[
        (600.0, "2024-01-01 03:00:00"),  // 0: R3
        (500.0, "2024-01-01 02:00:00"),  // 1: amount not > 500
        (700.0, "2024-01-01 06:00:00"),  // 2: 06:00 is outside [0, 6)
        (800.0, "ontem a noite"),        // 3: unparseable
        (900.0, ""),                     // 4: missing
        (550.0, "2024-01-01T00:00:00"),  // 5: R3 at midnight
        (1000.0, "2024-01-01 12:00:00"), // 6: R1 only
        (100.0, "2024-01-01 01:00:00"),  // 7: too small
        (200.0, "2024-01-01 13:00:00"),  // 8
        (300.0, "2024-01-02"),           // 9: date-only, midnight, too small
    ]);
    let out = overlay().apply(&t, &zeros(t.len())).unwrap();

    let r3_rows: Vec<usize> = (0..t.len())
        .filter(|&i| out.hits[i].contains(&OverlayRule::NighttimeHighValue))
        .collect();
    assert_eq!(r3_rows, vec![0, 5]);

    assert_eq!(out.labels[3], LABEL_NORMAL, "unparseable data_hora leaves the row alone");
    assert_eq!(out.labels[4], LABEL_NORMAL);
    assert_eq!(out.labels[6], LABEL_SUSPICIOUS);
    assert_eq!(out.unparsed_timestamps, 1, "empty cells are missing, not unparsed");

    let hours = out.hours.as_ref().expect("data_hora present");
    assert_eq!(hours[0], Some(3));
    assert_eq!(hours[3], None);
    assert_eq!(hours[9], Some(0));
}

#[test]
fn r3_skipped_without_data_hora() {
    let t = table_from(&[(900.0, 5.0), (950.0, 5.0), (10.0, 5.0)]);
    let out = overlay().apply(&t, &zeros(3)).unwrap();
    assert!(out.hours.is_none());
    assert_eq!(out.hit_count(OverlayRule::NighttimeHighValue), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Overlay-wide invariants
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn model_flags_are_never_cleared() {
    let t = table_with_times(&[
        (10.0, "2024-01-01 12:00:00"),
        (20.0, "nope"),
        (30.0, "2024-01-01 03:00:00"),
    ]);
    let base = vec![LABEL_SUSPICIOUS, LABEL_NORMAL, LABEL_SUSPICIOUS];
    let out = overlay().apply(&t, &base).unwrap();

    for (i, (&b, &f)) in base.iter().zip(&out.labels).enumerate() {
        assert!(f >= b, "row {i} downgraded from {b} to {f}");
    }
}

#[test]
fn final_label_is_model_or_any_rule() {
    let t = table_with_times(&[
        (600.0, "2024-01-01 03:00:00"),
        (5000.0, "2024-01-01 15:00:00"),
        (50.0, "2024-01-01 04:00:00"),
        (70.0, "2024-01-01 10:00:00"),
    ]);
    let base = vec![LABEL_NORMAL, LABEL_NORMAL, LABEL_NORMAL, LABEL_SUSPICIOUS];
    let ov = overlay();
    let out = ov.apply(&t, &base).unwrap();

    for i in 0..t.len() {
        let facts = RowFacts {
            valor: t.numeric_column("valor").unwrap()[i],
            tempo_empresa_anos: 5.0,
            hour: out.hours.as_ref().unwrap()[i],
        };
        // Any evaluation order gives the same OR.
        let forward = OverlayRule::ALL.iter().any(|&r| ov.fires(r, &facts, &out.thresholds));
        let backward = OverlayRule::ALL.iter().rev().any(|&r| ov.fires(r, &facts, &out.thresholds));
        assert_eq!(forward, backward);

        let expected = if base[i] == LABEL_SUSPICIOUS || forward { LABEL_SUSPICIOUS } else { LABEL_NORMAL };
        assert_eq!(out.labels[i], expected, "row {i}");
    }
}

#[test]
fn label_count_mismatch_is_an_error() {
    let t = table_from(&[(1.0, 1.0), (2.0, 2.0)]);
    assert!(overlay().apply(&t, &zeros(3)).is_err());
}

#[test]
fn descriptions_mention_their_thresholds() {
    let cfg = RuleConfig::default();
    assert!(OverlayRule::ExtremeValue.description(&cfg).contains("99"));
    assert!(OverlayRule::NewBusinessHighValue.description(&cfg).contains("90"));
    assert!(OverlayRule::NighttimeHighValue.description(&cfg).contains("500.00"));
}
