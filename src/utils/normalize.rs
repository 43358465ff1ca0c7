//! Declarative field mapping for the open-data feeds.
//!
//! Upstream records change key names between revisions (typos, localized
//! labels, `key(key)` duplicates). Each dataset gets a [`Schema`] table of
//! output field → candidate input keys, so covering a new variant means
//! adding a string to a table.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Flag,
    /// Percentage out of 100.
    Rate,
}

/// Closed domain for single-letter upstream flags (`T`/`F`/`N`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Flag {
    Yes,
    No,
    Unknown,
}

impl Flag {
    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Yes => "yes",
            Flag::No => "no",
            Flag::Unknown => "unknown",
        }
    }
}

#[derive(Debug)]
pub struct FieldRule {
    pub output: &'static str,
    pub candidates: &'static [&'static str],
    pub kind: FieldKind,
}

/// `output = numerator / denominator * 100`, only when `output` was not
/// supplied directly.
#[derive(Debug)]
pub struct DerivedRate {
    pub output: &'static str,
    pub numerator: &'static str,
    pub denominator: &'static str,
}

#[derive(Debug)]
pub struct Schema {
    pub id_prefix: &'static str,
    pub id_candidates: &'static [&'static str],
    pub fields: &'static [FieldRule],
    pub derived: &'static [DerivedRate],
}

const fn text(output: &'static str, candidates: &'static [&'static str]) -> FieldRule {
    FieldRule {
        output,
        candidates,
        kind: FieldKind::Text,
    }
}

const fn number(output: &'static str, candidates: &'static [&'static str]) -> FieldRule {
    FieldRule {
        output,
        candidates,
        kind: FieldKind::Number,
    }
}

const fn flag(output: &'static str, candidates: &'static [&'static str]) -> FieldRule {
    FieldRule {
        output,
        candidates,
        kind: FieldKind::Flag,
    }
}

const fn rate(output: &'static str, candidates: &'static [&'static str]) -> FieldRule {
    FieldRule {
        output,
        candidates,
        kind: FieldKind::Rate,
    }
}

pub static ADOPT: Schema = Schema {
    id_prefix: "adopt",
    id_candidates: &["animal_id", "animal_subid"],
    fields: &[
        text("subId", &["animal_subid"]),
        text("shelterId", &["animal_shelter_pkid"]),
        text("areaId", &["animal_area_pkid"]),
        text("place", &["animal_place"]),
        text("kind", &["animal_kind", "動物別"]),
        text("variety", &["animal_Variety", "animal_variety", "品種"]),
        text("sex", &["animal_sex", "性別"]),
        text("bodyType", &["animal_bodytype"]),
        text("colour", &["animal_colour", "animal_color", "毛色"]),
        text("age", &["animal_age"]),
        flag("sterilization", &["animal_sterilization"]),
        flag("vaccinated", &["animal_bacterin"]),
        text("foundPlace", &["animal_foundplace"]),
        text("status", &["animal_status"]),
        text("remark", &["animal_remark"]),
        text("openDate", &["animal_opendate"]),
        text("closedDate", &["animal_closeddate"]),
        text("updatedAt", &["animal_update"]),
        text("createdAt", &["animal_createtime"]),
        text("shelterName", &["shelter_name"]),
        text("shelterAddress", &["shelter_address"]),
        text("shelterTel", &["shelter_tel"]),
        text("picture", &["album_file", "PICTURE"]),
    ],
    derived: &[],
};

pub static LOST: Schema = Schema {
    id_prefix: "lost",
    id_candidates: &["晶片號碼", "晶片編號", "編號", "PICTURE"],
    fields: &[
        text("chipNo", &["晶片號碼", "晶片編號", "編號"]),
        text("name", &["寵物名", "動物名"]),
        text("kind", &["寵物別", "寵物種類", "動物別"]),
        text("sex", &["性別"]),
        text("variety", &["品種"]),
        text("color", &["毛色"]),
        text("appearance", &["外觀"]),
        text("feature", &["特徵"]),
        text("lostDate", &["遺失時間", "遺失日期"]),
        text("lostPlace", &["遺失地點"]),
        text("keeper", &["飼主姓名", "聯絡人", "聯絡姓名", "連絡人"]),
        text("phone", &["聯絡電話", "連絡電話", "電話"]),
        text("email", &["Email", "EMail", "EMAIL"]),
        text("picture", &["PICTURE"]),
    ],
    derived: &[],
};

pub static SHELTERS: Schema = Schema {
    id_prefix: "shelter",
    id_candidates: &["ID", "id", "Seq"],
    fields: &[
        number("seq", &["Seq"]),
        text("name", &["ShelterName", "name"]),
        text("cityCode", &["CityName", "cityCode"]),
        text("phone", &["Phone", "phone"]),
        text("openTime", &["OpenTime", "openTime"]),
        text("address", &["Address", "address"]),
        text("lon", &["Lon", "lon"]),
        text("lat", &["Lat", "lat"]),
    ],
    derived: &[],
};

pub static STATS: Schema = Schema {
    id_prefix: "stats",
    id_candidates: &[],
    fields: &[
        text("year", &["rpt_year", "年度"]),
        text("month", &["rpt_month", "月份"]),
        text("county", &["rpt_country", "rpt_county", "縣市"]),
        text("countyCode", &["rpt_country_code", "rpt_county_code"]),
        number("acceptNum", &["accept_num", "收容數"]),
        number("adoptNum", &["adopt_num", "認領養數"]),
        rate("adoptRate", &["adopt_rate", "認領養率"]),
        number("endNum", &["end_num", "人道處理數"]),
        rate("endRate", &["end_rate", "人道處理率"]),
        number("deadNum", &["dead_num", "所內死亡數"]),
        rate("deadRate", &["dead_rate", "所內死亡率"]),
    ],
    derived: &[
        DerivedRate {
            output: "adoptRate",
            numerator: "adoptNum",
            denominator: "acceptNum",
        },
        DerivedRate {
            output: "endRate",
            numerator: "endNum",
            denominator: "acceptNum",
        },
        DerivedRate {
            output: "deadRate",
            numerator: "deadNum",
            denominator: "acceptNum",
        },
    ],
};

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// First non-blank value among `candidates`, also trying each key in its
/// `key(key)` form.
pub fn lookup<'a>(record: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    let object = record.as_object()?;
    candidates.iter().find_map(|key| {
        object
            .get(*key)
            .filter(|v| !is_blank(v))
            .or_else(|| object.get(&format!("{key}({key})")).filter(|v| !is_blank(v)))
    })
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

pub fn resolve_text(record: &Value, candidates: &[&str]) -> Option<String> {
    lookup(record, candidates).map(text_of)
}

/// Parses upstream numeric text: full-width digits, `%`, and thousands
/// separators are accepted.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter_map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32),
            '．' => Some('.'),
            '－' => Some('-'),
            ',' | '，' | '%' | '％' => None,
            c if c.is_whitespace() => None,
            c => Some(c),
        })
        .collect();

    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// `"50%"`, `"50"` and `0.5` all read as 50. Only a JSON number in `[0, 1]`
/// is taken as a fraction; text is always a percentage.
pub fn parse_rate(value: &Value) -> Option<f64> {
    let n = number_from(value)?;
    let percent = match value {
        Value::Number(_) if (0.0..=1.0).contains(&n) => n * 100.0,
        _ => n,
    };
    Some(round2(percent))
}

pub fn parse_flag(value: Option<&Value>) -> Flag {
    match value {
        Some(Value::Bool(true)) => Flag::Yes,
        Some(Value::Bool(false)) => Flag::No,
        Some(v) => match text_of(v).to_uppercase().as_str() {
            "T" | "Y" | "TRUE" | "YES" | "是" | "有" => Flag::Yes,
            "F" | "FALSE" | "NO" | "否" | "無" => Flag::No,
            _ => Flag::Unknown,
        },
        None => Flag::Unknown,
    }
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Integral values serialize as JSON integers so `50.0` and `50` compare equal.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

pub fn normalize_record(schema: &Schema, record: &Value, index: usize) -> Value {
    let mut out = Map::new();

    let id = resolve_text(record, schema.id_candidates)
        .unwrap_or_else(|| format!("{}_{}", schema.id_prefix, index));
    out.insert("id".to_string(), Value::String(id));

    let mut numbers: HashMap<&str, Option<f64>> = HashMap::new();
    for rule in schema.fields {
        let found = lookup(record, rule.candidates);
        let value = match rule.kind {
            FieldKind::Text => Value::String(found.map(text_of).unwrap_or_default()),
            FieldKind::Flag => Value::String(parse_flag(found).as_str().to_string()),
            FieldKind::Number => {
                let n = found.and_then(number_from);
                numbers.insert(rule.output, n);
                number_value(n.unwrap_or(0.0))
            }
            FieldKind::Rate => {
                let n = found.and_then(parse_rate);
                numbers.insert(rule.output, n);
                number_value(n.unwrap_or(0.0))
            }
        };
        out.insert(rule.output.to_string(), value);
    }

    for derived in schema.derived {
        let resolved = |name: &str| numbers.get(name).copied().flatten();
        if resolved(derived.output).is_some() {
            continue;
        }
        let operands = (resolved(derived.numerator), resolved(derived.denominator));
        if let (Some(num), Some(den)) = operands {
            if den > 0.0 {
                out.insert(
                    derived.output.to_string(),
                    number_value(round2(num / den * 100.0)),
                );
            }
        }
    }

    out.insert("raw".to_string(), record.clone());
    Value::Object(out)
}

pub fn normalize_all(schema: &Schema, records: &[Value]) -> Vec<Value> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| normalize_record(schema, record, index))
        .collect()
}

/// Resolves one output field of `schema` against a raw record.
pub fn field_text(schema: &Schema, output: &str, record: &Value) -> Option<String> {
    let rule = schema.fields.iter().find(|rule| rule.output == output)?;
    resolve_text(record, rule.candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lost_record_resolves_aliases_and_paren_keys() {
        let record = json!({
            "晶片編號": " 900123 ",
            "寵物名": "小黑",
            "寵物種類": "狗",
            "連絡人(連絡人)": "王小明",
            "EMail": "a@b.tw",
            "遺失地點": "",
        });

        let out = normalize_record(&LOST, &record, 0);
        assert_eq!(out["id"], "900123");
        assert_eq!(out["chipNo"], "900123");
        assert_eq!(out["name"], "小黑");
        assert_eq!(out["kind"], "狗");
        assert_eq!(out["keeper"], "王小明");
        assert_eq!(out["email"], "a@b.tw");
        assert_eq!(out["lostPlace"], "");
        assert_eq!(out["raw"], record);
    }

    #[test]
    fn renormalizing_output_falls_back_to_defaults() {
        let record = json!({"晶片號碼": "1", "寵物名": "Lucky", "性別": "公"});
        let once = normalize_record(&LOST, &record, 3);
        let twice = normalize_record(&LOST, &once, 3);

        assert_eq!(twice["id"], "lost_3");
        for rule in LOST.fields {
            assert_eq!(twice[rule.output], "", "field {}", rule.output);
        }
    }

    #[test]
    fn non_object_record_yields_defaults() {
        let out = normalize_record(&SHELTERS, &json!("nope"), 1);
        assert_eq!(out["id"], "shelter_1");
        assert_eq!(out["seq"], 0);
        assert_eq!(out["name"], "");
    }

    #[test]
    fn shelter_numbers_and_id() {
        let record = json!({
            "Seq": "１２",
            "ShelterName": "臺北市動物之家",
            "CityName": "63"
        });
        let out = normalize_record(&SHELTERS, &record, 0);
        assert_eq!(out["id"], "１２");
        assert_eq!(out["seq"], 12);
        assert_eq!(out["cityCode"], "63");
    }

    #[test]
    fn numbers_tolerate_separators_and_full_width() {
        assert_eq!(parse_number("1,234"), Some(1234.0));
        assert_eq!(parse_number("１，２３４"), Some(1234.0));
        assert_eq!(parse_number("12.5%"), Some(12.5));
        assert_eq!(parse_number(" "), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn percent_text_and_fraction_agree() {
        assert_eq!(parse_rate(&json!("50%")), Some(50.0));
        assert_eq!(parse_rate(&json!(0.5)), Some(50.0));
        assert_eq!(parse_rate(&json!("５０％")), Some(50.0));
        assert_eq!(parse_rate(&json!("37.5")), Some(37.5));
    }

    #[test]
    fn small_rate_text_stays_a_percentage() {
        assert_eq!(parse_rate(&json!("0.8")), Some(0.8));
        assert_eq!(parse_rate(&json!("1")), Some(1.0));
        assert_eq!(parse_rate(&json!("0.8%")), Some(0.8));
        assert_eq!(parse_rate(&json!(1)), Some(100.0));

        let out = normalize_record(&STATS, &json!({"adopt_rate": "0.8"}), 0);
        assert_eq!(out["adoptRate"], 0.8);
    }

    #[test]
    fn flags_map_to_closed_domain() {
        assert_eq!(parse_flag(Some(&json!("T"))), Flag::Yes);
        assert_eq!(parse_flag(Some(&json!("f"))), Flag::No);
        assert_eq!(parse_flag(Some(&json!("N"))), Flag::Unknown);
        assert_eq!(parse_flag(Some(&json!(true))), Flag::Yes);
        assert_eq!(parse_flag(None), Flag::Unknown);

        let record = json!({"animal_id": 42, "animal_sterilization": "T"});
        let out = normalize_record(&ADOPT, &record, 0);
        assert_eq!(out["id"], "42");
        assert_eq!(out["sterilization"], "yes");
        assert_eq!(out["vaccinated"], "unknown");
    }

    #[test]
    fn rate_is_derived_when_absent() {
        let record = json!({"accept_num": "200", "adopt_num": "50", "dead_num": 0});
        let out = normalize_record(&STATS, &record, 0);
        assert_eq!(out["adoptRate"], json!(25));
        assert_eq!(out["deadRate"], json!(0));
        assert_eq!(out["endRate"], json!(0));
    }

    #[test]
    fn derived_rate_never_overwrites_direct_value() {
        let record = json!({"accept_num": 200, "adopt_num": 50, "adopt_rate": "50%"});
        let out = normalize_record(&STATS, &record, 0);
        assert_eq!(out["adoptRate"], json!(50));
    }

    #[test]
    fn derived_rate_skips_zero_denominator() {
        let record = json!({"accept_num": 0, "adopt_num": 5});
        let out = normalize_record(&STATS, &record, 0);
        assert_eq!(out["adoptRate"], json!(0));
    }

    #[test]
    fn normalize_all_indexes_fallback_ids() {
        let out = normalize_all(&STATS, &[json!({}), json!({"rpt_year": "2023"})]);
        assert_eq!(out[0]["id"], "stats_0");
        assert_eq!(out[1]["id"], "stats_1");
        assert_eq!(out[1]["year"], "2023");
    }

    #[test]
    fn field_text_finds_rule_by_output() {
        let record = json!({"CityName": "65"});
        assert_eq!(field_text(&SHELTERS, "cityCode", &record).as_deref(), Some("65"));
        assert_eq!(field_text(&SHELTERS, "missing", &record), None);
    }
}
