// ==========================================
// 飞行日志导入导出 - 源字段别名表
// ==========================================
// 职责: 每个规范字段可接受的源字段名（匹配时忽略大小写与 _ - 空格 .）
// 顺序: 规范名在前,源日志导出的字段名随后
// ==========================================

// ===== 类型标签 =====
pub const TABLE_TAG: &[&str] = &["table", "type_tag", "record_type", "entity", "_table"];

// ===== 通用 =====
pub const GUID: &[&str] = &["guid", "uuid", "record_guid"];

// ===== Aircraft =====
pub const AIRCRAFT_REGISTRATION: &[&str] =
    &["registration", "reg", "tail_number", "tail", "reference", "ac_reg"];
pub const AIRCRAFT_SOURCE_CODE: &[&str] = &["source_code", "aircraft_code"];
pub const AIRCRAFT_TYPE: &[&str] = &["aircraft_type", "type", "ac_type", "type_code"];
pub const AIRCRAFT_MAKE: &[&str] = &["make", "manufacturer"];
pub const AIRCRAFT_MODEL: &[&str] = &["model"];
pub const AIRCRAFT_SUB_MODEL: &[&str] = &["sub_model", "submodel", "variant"];
pub const AIRCRAFT_CATEGORY: &[&str] = &["category"];
pub const AIRCRAFT_CLASS: &[&str] = &["aircraft_class", "class"];
pub const AIRCRAFT_ENGINE_TYPE: &[&str] = &["engine_type", "eng_type", "power"];
pub const AIRCRAFT_SEATS: &[&str] = &["seats", "seat_count"];
pub const AIRCRAFT_ACTIVE: &[&str] = &["active"];
pub const AIRCRAFT_TAILWHEEL: &[&str] = &["tailwheel", "tail_wheel"];
pub const AIRCRAFT_COMPLEX: &[&str] = &["complex"];
pub const AIRCRAFT_HIGH_PERFORMANCE: &[&str] = &["high_performance", "high_perf", "hp"];
pub const AIRCRAFT_AEROBATIC: &[&str] = &["aerobatic"];
pub const AIRCRAFT_COMPANY: &[&str] = &["company", "operator"];
pub const AIRCRAFT_RATING: &[&str] = &["rating"];

// ===== Pilot =====
pub const PILOT_ID: &[&str] = &["pilot_id", "id", "pilot_ref", "ref", "employee_id"];
pub const PILOT_SOURCE_CODE: &[&str] = &["source_code", "pilot_code"];
pub const PILOT_NAME: &[&str] = &["name", "pilot_name", "full_name"];
pub const PILOT_LICENSE: &[&str] = &["license", "licence", "certificate", "license_number"];
pub const PILOT_EMAIL: &[&str] = &["email", "pilot_email", "e_mail"];
pub const PILOT_PHONE: &[&str] = &["phone", "pilot_phone", "mobile"];
pub const PILOT_COMPANY: &[&str] = &["company", "employer"];
pub const PILOT_ROSTER_ALIAS: &[&str] = &["roster_alias", "alias"];
pub const PILOT_ACTIVE: &[&str] = &["active"];
pub const PILOT_NOTES: &[&str] = &["notes", "note", "comment"];

// ===== Airfield =====
pub const AIRFIELD_CODE: &[&str] = &["code", "airfield_code", "airport_code"];
pub const AIRFIELD_SOURCE_CODE: &[&str] = &["source_code", "af_code"];
pub const AIRFIELD_ICAO: &[&str] = &["icao", "af_icao", "icao_code"];
pub const AIRFIELD_IATA: &[&str] = &["iata", "af_iata", "iata_code"];
pub const AIRFIELD_NAME: &[&str] = &["name", "af_name", "airfield_name", "airport_name"];
pub const AIRFIELD_CITY: &[&str] = &["city", "af_city"];
pub const AIRFIELD_COUNTRY: &[&str] = &["country", "af_country"];
pub const AIRFIELD_LATITUDE: &[&str] = &["latitude", "lat"];
pub const AIRFIELD_LONGITUDE: &[&str] = &["longitude", "lon", "lng"];
pub const AIRFIELD_ELEVATION: &[&str] = &["elevation_ft", "elevation", "elev"];
pub const AIRFIELD_TIMEZONE: &[&str] = &["timezone", "tz_code", "tz"];
pub const AIRFIELD_NOTES: &[&str] = &["notes", "af_notes", "comment"];

// ===== Setting =====
pub const SETTING_SOURCE_CODE: &[&str] = &["source_code", "config_code"];
pub const SETTING_SCOPE: &[&str] = &["scope", "group", "config_group"];
pub const SETTING_KEY: &[&str] = &["key", "config_key", "setting", "name"];
pub const SETTING_VALUE: &[&str] = &["value", "config_value", "data"];

// ===== Flight =====
pub const FLIGHT_KEY: &[&str] = &["flight_key", "flight_id"];
pub const FLIGHT_SOURCE_CODE: &[&str] = &["source_code", "flight_code"];
pub const FLIGHT_DATE: &[&str] = &["date", "flight_date", "date_utc", "date_local"];
pub const FLIGHT_AIRCRAFT: &[&str] =
    &["aircraft", "aircraft_code", "registration", "reg", "tail_number"];
pub const FLIGHT_PILOT: &[&str] = &["pilot", "pilot_id", "p1_code", "pic", "captain"];
pub const FLIGHT_ORIGIN: &[&str] = &["origin", "from", "departure", "dep_code", "dep"];
pub const FLIGHT_DESTINATION: &[&str] = &["destination", "to", "arrival", "arr_code", "arr"];
pub const FLIGHT_ROUTE: &[&str] = &["route", "via"];
pub const FLIGHT_DEPARTURE_TIME: &[&str] =
    &["departure_time", "dep_time", "dep_time_utc", "off_block"];
pub const FLIGHT_ARRIVAL_TIME: &[&str] =
    &["arrival_time", "arr_time", "arr_time_utc", "on_block"];
pub const FLIGHT_TOTAL: &[&str] = &["total_minutes", "min_total", "total_time", "total"];
pub const FLIGHT_PIC: &[&str] = &["pic_minutes", "min_pic", "pic_time"];
pub const FLIGHT_SIC: &[&str] = &["sic_minutes", "min_cop", "min_sic", "sic_time"];
pub const FLIGHT_NIGHT: &[&str] = &["night_minutes", "min_night", "night_time"];
pub const FLIGHT_IFR: &[&str] = &["ifr_minutes", "min_ifr", "ifr_time"];
pub const FLIGHT_XC: &[&str] = &["cross_country_minutes", "min_xc", "xc_time"];
pub const FLIGHT_DUAL: &[&str] = &["dual_minutes", "min_dual", "dual_time"];
pub const FLIGHT_DAY_TAKEOFFS: &[&str] = &["day_takeoffs", "to_day", "takeoffs_day"];
pub const FLIGHT_NIGHT_TAKEOFFS: &[&str] = &["night_takeoffs", "to_night", "takeoffs_night"];
pub const FLIGHT_DAY_LANDINGS: &[&str] = &["day_landings", "ldg_day", "landings_day", "landings"];
pub const FLIGHT_NIGHT_LANDINGS: &[&str] = &["night_landings", "ldg_night", "landings_night"];
pub const FLIGHT_HOLDS: &[&str] = &["holds", "holding"];
pub const FLIGHT_APPROACHES: &[&str] = &["approaches", "tag_approach", "approach"];
pub const FLIGHT_DISTANCE: &[&str] = &["distance", "dist"];
pub const FLIGHT_REMARKS: &[&str] = &["remarks", "remark", "notes", "comment"];

// ===== Image =====
pub const IMAGE_KEY: &[&str] = &["image_key", "image_id"];
pub const IMAGE_SOURCE_CODE: &[&str] = &["source_code", "img_code", "image_code"];
pub const IMAGE_PARENT: &[&str] = &["parent", "link_code", "linked_to", "flight"];
pub const IMAGE_FILE_NAME: &[&str] = &["file_name", "filename"];
pub const IMAGE_FILE_EXT: &[&str] = &["file_ext", "extension", "ext"];
pub const IMAGE_FILE_PATH: &[&str] = &["file_path", "img_upload", "path", "url"];

// ===== Limit =====
pub const LIMIT_KEY: &[&str] = &["limit_key", "limit_id"];
pub const LIMIT_SOURCE_CODE: &[&str] = &["source_code", "limit_code"];
pub const LIMIT_RULE_TYPE: &[&str] = &["rule_type", "l_type", "limit_type"];
pub const LIMIT_SCOPE: &[&str] = &["scope", "limit_scope", "applies_to"];
pub const LIMIT_TARGET: &[&str] = &["target", "limit_target", "target_code"];
pub const LIMIT_THRESHOLD: &[&str] = &["threshold", "l_minutes", "limit_minutes", "limit_value"];
pub const LIMIT_PERIOD: &[&str] = &["period", "l_period_code", "period_code"];
pub const LIMIT_ZONE: &[&str] = &["zone", "l_zone"];
pub const LIMIT_VALID_FROM: &[&str] = &["valid_from", "l_from", "from_date"];
pub const LIMIT_VALID_TO: &[&str] = &["valid_to", "l_to", "to_date"];

// ===== Query =====
pub const QUERY_KEY: &[&str] = &["query_key", "query_id"];
pub const QUERY_SOURCE_CODE: &[&str] = &["source_code", "mq_code", "mqb_code", "query_code"];
pub const QUERY_NAME: &[&str] = &["name", "query_name"];
pub const QUERY_SHORT_NAME: &[&str] = &["short_name", "shortname"];
pub const QUERY_DEFINITION: &[&str] = &["definition", "filter", "query"];
pub const QUERY_BUILD_CLAUSES: &[&str] = &["build1", "build2", "build3", "build4"];
pub const QUERY_QUICK_VIEW: &[&str] = &["quick_view", "quickview"];
pub const QUERY_OWNER: &[&str] = &["owner", "owner_pilot", "pilot"];

// ===== Qualification =====
pub const QUALIFICATION_KEY: &[&str] = &["qualification_key", "qualification_id"];
pub const QUALIFICATION_SOURCE_CODE: &[&str] = &["source_code", "q_code", "qualification_code"];
pub const QUALIFICATION_PILOT: &[&str] = &["pilot", "pilot_id", "pilot_code", "holder"];
pub const QUALIFICATION_TYPE: &[&str] =
    &["qualification_type", "q_type_code", "qual_type", "rating_type"];
pub const QUALIFICATION_ISSUED: &[&str] = &["issued", "date_issued", "issue_date"];
pub const QUALIFICATION_EXPIRES: &[&str] =
    &["expires", "date_valid", "expiry", "expiry_date", "valid_until"];
pub const QUALIFICATION_VALIDITY: &[&str] = &["validity", "validity_months"];
pub const QUALIFICATION_NOTIFY_DAYS: &[&str] = &["notify_days", "notify"];
pub const QUALIFICATION_AIRFIELD: &[&str] = &["airfield", "ref_airfield", "airport"];
pub const QUALIFICATION_NOTES: &[&str] = &["notes", "notify_comment", "comment"];

// ==========================================
// 分类判定用的形状特征字段
// ==========================================
pub const SHAPE_QUALIFICATION: &[&str] = &[
    "qualification_type",
    "q_type_code",
    "qual_type",
    "date_issued",
    "issued",
    "date_valid",
    "expires",
    "expiry",
    "q_code",
];
pub const SHAPE_IMAGE: &[&str] = &[
    "image_key",
    "img_code",
    "image_code",
    "file_name",
    "filename",
    "file_ext",
    "img_upload",
    "link_code",
];
pub const SHAPE_LIMIT: &[&str] = &[
    "limit_key",
    "limit_code",
    "rule_type",
    "l_type",
    "threshold",
    "l_minutes",
    "l_period_code",
];
pub const SHAPE_QUERY: &[&str] = &[
    "query_key",
    "mq_code",
    "mqb_code",
    "query_code",
    "definition",
    "filter",
    "build1",
    "quick_view",
];
pub const SHAPE_AIRFIELD: &[&str] = &[
    "airfield_code",
    "airport_code",
    "af_code",
    "icao",
    "af_icao",
    "iata",
    "af_iata",
    "af_name",
];
pub const SHAPE_AIRCRAFT: &[&str] = &[
    "registration",
    "reg",
    "tail_number",
    "tail",
    "reference",
    "ac_reg",
    "aircraft_code",
];
pub const SHAPE_PILOT: &[&str] = &[
    "pilot_id",
    "pilot_ref",
    "pilot_code",
    "pilot_name",
    "license",
    "licence",
    "certificate",
    "pilot_email",
    "roster_alias",
];
pub const SHAPE_SETTING_CODE: &[&str] = &["config_code", "setting_key"];
