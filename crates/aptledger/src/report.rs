//! Spending reports.
//!
//! Reports are computed from a slice of purchases plus every vendor and item
//! they reference, fetched up front. Nothing here touches storage, so every
//! aggregation is a plain reduction over its inputs.
//!
//! Purchases whose vendor or item no longer exists still count toward
//! totals, but are left out of groupings that need the missing record.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Item, Language, Purchase, Vendor};

const MONTHS_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const MONTHS_AR: [&str; 12] = [
    "يناير",
    "فبراير",
    "مارس",
    "أبريل",
    "مايو",
    "يونيو",
    "يوليو",
    "أغسطس",
    "سبتمبر",
    "أكتوبر",
    "نوفمبر",
    "ديسمبر",
];

/// Name of a month (1-12), or an empty string out of range.
#[must_use]
pub fn month_name(month: u32, language: Language) -> &'static str {
    let names = match language {
        Language::En => &MONTHS_EN,
        Language::Ar => &MONTHS_AR,
    };
    month
        .checked_sub(1)
        .and_then(|i| names.get(i as usize))
        .copied()
        .unwrap_or("")
}

/// Shown when a purchase points at a record that no longer exists.
#[must_use]
pub fn unknown_name(language: Language) -> &'static str {
    match language {
        Language::En => "Unknown",
        Language::Ar => "غير معروف",
    }
}

/// The available reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Totals for a month.
    Monthly,
    /// Totals per month of a year.
    Yearly,
    /// Spending per category.
    Category,
    /// Spending per vendor.
    Vendor,
    /// Spending per item.
    Item,
}

impl ReportKind {
    /// Report title in a language.
    #[must_use]
    pub fn title(&self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Monthly, Language::En) => "Monthly Report",
            (Self::Monthly, Language::Ar) => "التقرير الشهري",
            (Self::Yearly, Language::En) => "Yearly Report",
            (Self::Yearly, Language::Ar) => "التقرير السنوي",
            (Self::Category, Language::En) => "Category Report",
            (Self::Category, Language::Ar) => "تقرير الفئات",
            (Self::Vendor, Language::En) => "Vendor Report",
            (Self::Vendor, Language::Ar) => "تقرير الموردين",
            (Self::Item, Language::En) => "Item Report",
            (Self::Item, Language::Ar) => "تقرير الأصناف",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Category => "category",
            Self::Vendor => "vendor",
            Self::Item => "item",
        })
    }
}

/// A half-open date range `[since, until)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportPeriod {
    /// First instant included.
    pub since: DateTime<Utc>,
    /// First instant excluded.
    pub until: DateTime<Utc>,
}

impl ReportPeriod {
    /// One calendar month.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an impossible month.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let since = first_of_month(year, month)?;
        let until = if month == 12 {
            first_of_month(year + 1, 1)?
        } else {
            first_of_month(year, month + 1)?
        };
        Ok(Self { since, until })
    }

    /// One calendar year.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unrepresentable year.
    pub fn year(year: i32) -> Result<Self> {
        Ok(Self {
            since: first_of_month(year, 1)?,
            until: first_of_month(year + 1, 1)?,
        })
    }

    /// The calendar month containing `at`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unrepresentable date.
    pub fn month_of(at: DateTime<Utc>) -> Result<Self> {
        Self::month(at.year(), at.month())
    }

    /// Whether `at` falls in the period.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.since <= at && at < self.until
    }

    /// Label like `March 2024`.
    #[must_use]
    pub fn label(&self, language: Language) -> String {
        let last = self.until - chrono::Duration::seconds(1);
        if self.since.year() == last.year() && self.since.month() == last.month() {
            format!("{} {}", month_name(self.since.month(), language), self.since.year())
        } else if self.since.month() == 1 && last.month() == 12 && self.since.year() == last.year() {
            self.since.year().to_string()
        } else {
            format!(
                "{} - {}",
                self.since.format("%Y-%m-%d"),
                last.format("%Y-%m-%d")
            )
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = Error;

    /// Parses `YYYY-MM` as a month or `YYYY` as a year.
    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::validation("period", format!("expected YYYY or YYYY-MM, got '{s}'"));
        match s.split_once('-') {
            Some((year, month)) => {
                let year = year.parse().map_err(|_| bad())?;
                let month = month.parse().map_err(|_| bad())?;
                Self::month(year, month)
            }
            None => Self::year(s.parse().map_err(|_| bad())?),
        }
    }
}

fn first_of_month(year: i32, month: u32) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok_or_else(|| Error::validation("period", format!("no such month {year}-{month:02}")))
}

/// Everything a report is computed from.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    /// Active purchases in the period.
    pub purchases: &'a [Purchase],
    /// Vendors the purchases reference.
    pub vendors: &'a HashMap<String, Vendor>,
    /// Items the purchases reference.
    pub items: &'a HashMap<String, Item>,
    /// Language for names and titles.
    pub language: Language,
    /// Period covered.
    pub period: ReportPeriod,
}

impl ReportInput<'_> {
    fn header(&self, kind: ReportKind, generated_at: DateTime<Utc>) -> ReportHeader {
        ReportHeader {
            kind,
            title: kind.title(self.language).to_string(),
            language: self.language,
            period: self.period,
            period_label: self.period.label(self.language),
            generated_at,
        }
    }

    fn total(&self) -> f64 {
        self.purchases.iter().map(|p| p.total_price).sum()
    }
}

/// Common report heading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportHeader {
    /// Which report.
    pub kind: ReportKind,
    /// Localized title.
    pub title: String,
    /// Language of names and labels.
    pub language: Language,
    /// Period covered.
    pub period: ReportPeriod,
    /// Localized period label.
    pub period_label: String,
    /// When the report was computed.
    pub generated_at: DateTime<Utc>,
}

/// One purchase line in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// When it was bought.
    pub purchased_at: DateTime<Utc>,
    /// Item name.
    pub item_name: String,
    /// Vendor name.
    pub vendor_name: String,
    /// Item category.
    pub category: String,
    /// Units bought.
    pub quantity: u32,
    /// Price per unit.
    pub unit_price: f64,
    /// Line total.
    pub total_price: f64,
}

/// A label with an amount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Amount {
    /// Category, vendor or month name.
    pub label: String,
    /// Sum spent.
    pub amount: f64,
}

/// Totals for a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    /// Heading.
    pub header: ReportHeader,
    /// Number of purchases.
    pub purchase_count: usize,
    /// Sum spent.
    pub total_amount: f64,
    /// Sum spent per purchase.
    pub average_purchase: f64,
    /// Spending per category, largest first.
    pub by_category: Vec<Amount>,
    /// Spending per vendor, largest first.
    pub by_vendor: Vec<Amount>,
    /// The purchases, newest first.
    pub purchases: Vec<ReportRow>,
}

/// Totals per month of a year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyReport {
    /// Heading.
    pub header: ReportHeader,
    /// Spending per month with purchases, in calendar order.
    pub by_month: Vec<Amount>,
    /// Spending per category, largest first.
    pub by_category: Vec<Amount>,
    /// Sum spent.
    pub total_amount: f64,
    /// Sum spent divided by twelve.
    pub monthly_average: f64,
}

/// Spending on one item within a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryItem {
    /// Item name.
    pub name: String,
    /// Sum spent.
    pub amount: f64,
    /// Number of purchases.
    pub count: usize,
}

/// Spending in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    /// Category name.
    pub category: String,
    /// Sum spent.
    pub total_amount: f64,
    /// Number of purchases.
    pub purchase_count: usize,
    /// Per item breakdown, largest first.
    pub items: Vec<CategoryItem>,
}

/// Spending per category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryReport {
    /// Heading.
    pub header: ReportHeader,
    /// Categories, largest first.
    pub categories: Vec<CategorySummary>,
}

/// One purchase from a vendor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorPurchase {
    /// When it was bought.
    pub purchased_at: DateTime<Utc>,
    /// Line total.
    pub amount: f64,
}

/// Spending with one vendor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorSummary {
    /// Vendor name.
    pub name: String,
    /// Contact person.
    pub contact_person: String,
    /// Phone number.
    pub phone: String,
    /// Email address.
    pub email: String,
    /// Sum spent.
    pub total_amount: f64,
    /// Number of purchases.
    pub purchase_count: usize,
    /// The purchases, newest first.
    pub purchases: Vec<VendorPurchase>,
}

/// Spending per vendor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorReport {
    /// Heading.
    pub header: ReportHeader,
    /// Vendors, largest first.
    pub vendors: Vec<VendorSummary>,
}

/// Spending on one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    /// Item name.
    pub name: String,
    /// Item category.
    pub category: String,
    /// Current list price.
    pub unit_price: f64,
    /// Units bought.
    pub total_quantity: u64,
    /// Sum spent.
    pub total_amount: f64,
    /// Number of purchases.
    pub purchase_count: usize,
    /// Sum spent per unit.
    pub average_price: f64,
}

/// Spending per item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReport {
    /// Heading.
    pub header: ReportHeader,
    /// Items, largest first.
    pub items: Vec<ItemSummary>,
}

/// Any report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Report {
    /// See [`MonthlyReport`].
    Monthly(MonthlyReport),
    /// See [`YearlyReport`].
    Yearly(YearlyReport),
    /// See [`CategoryReport`].
    Category(CategoryReport),
    /// See [`VendorReport`].
    Vendor(VendorReport),
    /// See [`ItemReport`].
    Item(ItemReport),
}

impl Report {
    /// The report heading.
    #[must_use]
    pub fn header(&self) -> &ReportHeader {
        match self {
            Self::Monthly(r) => &r.header,
            Self::Yearly(r) => &r.header,
            Self::Category(r) => &r.header,
            Self::Vendor(r) => &r.header,
            Self::Item(r) => &r.header,
        }
    }
}

/// Compute a report of `kind`.
#[must_use]
pub fn build(kind: ReportKind, input: &ReportInput<'_>, generated_at: DateTime<Utc>) -> Report {
    match kind {
        ReportKind::Monthly => Report::Monthly(monthly(input, generated_at)),
        ReportKind::Yearly => Report::Yearly(yearly(input, generated_at)),
        ReportKind::Category => Report::Category(by_category(input, generated_at)),
        ReportKind::Vendor => Report::Vendor(by_vendor(input, generated_at)),
        ReportKind::Item => Report::Item(by_item(input, generated_at)),
    }
}

/// Count, totals and lines for the period.
#[must_use]
pub fn monthly(input: &ReportInput<'_>, generated_at: DateTime<Utc>) -> MonthlyReport {
    let lang = input.language;
    let total = input.total();
    let count = input.purchases.len();

    let mut by_vendor: HashMap<String, f64> = HashMap::new();
    let mut rows = Vec::with_capacity(count);
    for p in input.purchases {
        let item = input.items.get(&p.item_id);
        let vendor = input.vendors.get(&p.vendor_id);
        if let Some(vendor) = vendor {
            *by_vendor.entry(vendor.name.get(lang).to_string()).or_default() += p.total_price;
        }
        rows.push(ReportRow {
            purchased_at: p.purchased_at,
            item_name: item.map_or(unknown_name(lang), |i| i.name.get(lang)).to_string(),
            vendor_name: vendor.map_or(unknown_name(lang), |v| v.name.get(lang)).to_string(),
            category: item.map(|i| i.category.clone()).unwrap_or_default(),
            quantity: p.quantity,
            unit_price: p.unit_price,
            total_price: p.total_price,
        });
    }
    rows.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));

    MonthlyReport {
        header: input.header(ReportKind::Monthly, generated_at),
        purchase_count: count,
        total_amount: total,
        average_purchase: if count > 0 { total / count as f64 } else { 0.0 },
        by_category: largest_first(category_totals(input)),
        by_vendor: largest_first(by_vendor),
        purchases: rows,
    }
}

/// Totals per month and per category.
#[must_use]
pub fn yearly(input: &ReportInput<'_>, generated_at: DateTime<Utc>) -> YearlyReport {
    let mut months: BTreeMap<u32, f64> = BTreeMap::new();
    for p in input.purchases {
        *months.entry(p.purchased_at.month()).or_default() += p.total_price;
    }
    let total = input.total();

    YearlyReport {
        header: input.header(ReportKind::Yearly, generated_at),
        by_month: months
            .into_iter()
            .map(|(month, amount)| Amount {
                label: month_name(month, input.language).to_string(),
                amount,
            })
            .collect(),
        by_category: largest_first(category_totals(input)),
        total_amount: total,
        monthly_average: total / 12.0,
    }
}

/// Spending per category, broken down by item.
#[must_use]
pub fn by_category(input: &ReportInput<'_>, generated_at: DateTime<Utc>) -> CategoryReport {
    let lang = input.language;
    let mut categories: HashMap<&str, (CategorySummary, HashMap<String, CategoryItem>)> =
        HashMap::new();

    for p in input.purchases {
        let Some(item) = input.items.get(&p.item_id) else {
            continue;
        };
        let (summary, items) = categories.entry(item.category.as_str()).or_insert_with(|| {
            (
                CategorySummary {
                    category: item.category.clone(),
                    total_amount: 0.0,
                    purchase_count: 0,
                    items: Vec::new(),
                },
                HashMap::new(),
            )
        });
        summary.total_amount += p.total_price;
        summary.purchase_count += 1;

        let name = item.name.get(lang).to_string();
        let line = items.entry(name.clone()).or_insert_with(|| CategoryItem {
            name,
            amount: 0.0,
            count: 0,
        });
        line.amount += p.total_price;
        line.count += 1;
    }

    let mut categories: Vec<CategorySummary> = categories
        .into_values()
        .map(|(mut summary, items)| {
            summary.items = items.into_values().collect();
            summary
                .items
                .sort_by(|a, b| b.amount.total_cmp(&a.amount).then_with(|| a.name.cmp(&b.name)));
            summary
        })
        .collect();
    categories.sort_by(|a, b| {
        b.total_amount
            .total_cmp(&a.total_amount)
            .then_with(|| a.category.cmp(&b.category))
    });

    CategoryReport {
        header: input.header(ReportKind::Category, generated_at),
        categories,
    }
}

/// Spending per vendor with contact details.
#[must_use]
pub fn by_vendor(input: &ReportInput<'_>, generated_at: DateTime<Utc>) -> VendorReport {
    let mut vendors: HashMap<&str, VendorSummary> = HashMap::new();
    for p in input.purchases {
        let Some(vendor) = input.vendors.get(&p.vendor_id) else {
            continue;
        };
        let summary = vendors.entry(vendor.id.as_str()).or_insert_with(|| VendorSummary {
            name: vendor.name.get(input.language).to_string(),
            contact_person: vendor.contact_person.clone(),
            phone: vendor.phone.clone(),
            email: vendor.email.clone(),
            total_amount: 0.0,
            purchase_count: 0,
            purchases: Vec::new(),
        });
        summary.total_amount += p.total_price;
        summary.purchase_count += 1;
        summary.purchases.push(VendorPurchase {
            purchased_at: p.purchased_at,
            amount: p.total_price,
        });
    }

    let mut vendors: Vec<VendorSummary> = vendors.into_values().collect();
    for v in &mut vendors {
        v.purchases.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
    }
    vendors.sort_by(|a, b| {
        b.total_amount
            .total_cmp(&a.total_amount)
            .then_with(|| a.name.cmp(&b.name))
    });

    VendorReport {
        header: input.header(ReportKind::Vendor, generated_at),
        vendors,
    }
}

/// Quantity, spending and average unit price per item.
#[must_use]
pub fn by_item(input: &ReportInput<'_>, generated_at: DateTime<Utc>) -> ItemReport {
    let mut items: HashMap<&str, ItemSummary> = HashMap::new();
    for p in input.purchases {
        let Some(item) = input.items.get(&p.item_id) else {
            continue;
        };
        let summary = items.entry(item.id.as_str()).or_insert_with(|| ItemSummary {
            name: item.name.get(input.language).to_string(),
            category: item.category.clone(),
            unit_price: item.unit_price,
            total_quantity: 0,
            total_amount: 0.0,
            purchase_count: 0,
            average_price: 0.0,
        });
        summary.total_quantity += u64::from(p.quantity);
        summary.total_amount += p.total_price;
        summary.purchase_count += 1;
    }

    let mut items: Vec<ItemSummary> = items
        .into_values()
        .map(|mut s| {
            if s.total_quantity > 0 {
                s.average_price = s.total_amount / s.total_quantity as f64;
            }
            s
        })
        .collect();
    items.sort_by(|a, b| {
        b.total_amount
            .total_cmp(&a.total_amount)
            .then_with(|| a.name.cmp(&b.name))
    });

    ItemReport {
        header: input.header(ReportKind::Item, generated_at),
        items,
    }
}

/// Spending per item category. Purchases of unknown items are skipped.
#[must_use]
pub fn category_totals(input: &ReportInput<'_>) -> HashMap<String, f64> {
    let mut totals: HashMap<String, f64> = HashMap::new();
    for p in input.purchases {
        if let Some(item) = input.items.get(&p.item_id) {
            *totals.entry(item.category.clone()).or_default() += p.total_price;
        }
    }
    totals
}

/// Sort label/amount pairs by amount, largest first, then by label.
#[must_use]
pub fn largest_first(totals: HashMap<String, f64>) -> Vec<Amount> {
    let mut amounts: Vec<Amount> = totals
        .into_iter()
        .map(|(label, amount)| Amount { label, amount })
        .collect();
    amounts.sort_by(|a, b| b.amount.total_cmp(&a.amount).then_with(|| a.label.cmp(&b.label)));
    amounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LocalizedName;
    use crate::retention::SoftDelete;

    struct Fixture {
        purchases: Vec<Purchase>,
        vendors: HashMap<String, Vendor>,
        items: HashMap<String, Item>,
    }

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap()
    }

    fn vendor(id: &str, en: &str, ar: &str) -> Vendor {
        Vendor {
            id: id.to_string(),
            name: LocalizedName::new(en, ar),
            contact_person: "Ali".to_string(),
            phone: "555-0100".to_string(),
            email: String::new(),
            created_at: at(1, 1),
            created_by: None,
            updated_at: at(1, 1),
            trash: SoftDelete::default(),
        }
    }

    fn item(id: &str, en: &str, category: &str, price: f64) -> Item {
        Item {
            id: id.to_string(),
            name: LocalizedName::new(en, ""),
            category: category.to_string(),
            unit_price: price,
            description: String::new(),
            created_at: at(1, 1),
            created_by: None,
            updated_at: at(1, 1),
            trash: SoftDelete::default(),
        }
    }

    fn purchase(id: &str, vendor: &str, item: &str, quantity: u32, price: f64, when: DateTime<Utc>) -> Purchase {
        Purchase {
            id: id.to_string(),
            apartment_id: "A1".to_string(),
            vendor_id: vendor.to_string(),
            item_id: item.to_string(),
            quantity,
            unit_price: price,
            total_price: Purchase::compute_total(quantity, price),
            purchased_at: when,
            added_by: "u-1".to_string(),
            added_at: when,
            updated_at: when,
            trash: SoftDelete::default(),
        }
    }

    fn fixture() -> Fixture {
        let vendors = [vendor("v1", "Panda", "بنده"), vendor("v2", "Danube", "")]
            .into_iter()
            .map(|v| (v.id.clone(), v))
            .collect();
        let items = [
            item("i1", "Milk", "Dairy", 5.0),
            item("i2", "Cheese", "Dairy", 20.0),
            item("i3", "Bread", "Bakery", 2.0),
        ]
        .into_iter()
        .map(|i| (i.id.clone(), i))
        .collect();
        let purchases = vec![
            purchase("p1", "v1", "i1", 2, 5.0, at(3, 2)),
            purchase("p2", "v1", "i2", 1, 20.0, at(3, 10)),
            purchase("p3", "v2", "i3", 3, 2.0, at(3, 15)),
            purchase("p4", "v2", "i1", 4, 4.5, at(3, 20)),
            purchase("p5", "gone", "gone", 1, 7.0, at(3, 21)),
        ];
        Fixture {
            purchases,
            vendors,
            items,
        }
    }

    fn input<'a>(f: &'a Fixture, language: Language) -> ReportInput<'a> {
        ReportInput {
            purchases: &f.purchases,
            vendors: &f.vendors,
            items: &f.items,
            language,
            period: ReportPeriod::month(2024, 3).unwrap(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_month_names() {
        assert_eq!(month_name(1, Language::En), "January");
        assert_eq!(month_name(12, Language::Ar), "ديسمبر");
        assert_eq!(month_name(0, Language::En), "");
        assert_eq!(month_name(13, Language::En), "");
    }

    #[test]
    fn test_period_parse() {
        let march: ReportPeriod = "2024-03".parse().unwrap();
        assert_eq!(march.since, at(3, 1) - chrono::Duration::hours(12));
        assert!(march.contains(at(3, 31)));
        assert!(!march.contains(march.until));
        assert_eq!(march.label(Language::En), "March 2024");

        let december = ReportPeriod::month(2023, 12).unwrap();
        assert_eq!(december.until, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let year: ReportPeriod = "2024".parse().unwrap();
        assert_eq!(year.label(Language::En), "2024");
        assert!("2024-13".parse::<ReportPeriod>().is_err());
        assert!("March".parse::<ReportPeriod>().is_err());
    }

    #[test]
    fn test_monthly_report() {
        let f = fixture();
        let report = monthly(&input(&f, Language::En), at(4, 1));

        assert_eq!(report.header.title, "Monthly Report");
        assert_eq!(report.purchase_count, 5);
        assert!(close(report.total_amount, 10.0 + 20.0 + 6.0 + 18.0 + 7.0));
        assert!(close(report.average_purchase, 61.0 / 5.0));

        assert_eq!(report.by_category[0].label, "Dairy");
        assert!(close(report.by_category[0].amount, 48.0));
        assert_eq!(report.by_category.len(), 2);

        assert_eq!(report.by_vendor[0].label, "Panda");
        assert!(close(report.by_vendor[0].amount, 30.0));
        assert!(close(report.by_vendor[1].amount, 24.0));

        assert_eq!(report.purchases[0].purchased_at, at(3, 21));
        assert_eq!(report.purchases[0].item_name, "Unknown");
    }

    #[test]
    fn test_monthly_report_in_arabic() {
        let f = fixture();
        let report = monthly(&input(&f, Language::Ar), at(4, 1));
        assert_eq!(report.header.title, "التقرير الشهري");
        let labels: Vec<&str> = report.by_vendor.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["بنده", "Danube"]);
    }

    #[test]
    fn test_empty_monthly_report() {
        let f = Fixture {
            purchases: Vec::new(),
            vendors: HashMap::new(),
            items: HashMap::new(),
        };
        let report = monthly(&input(&f, Language::En), at(4, 1));
        assert_eq!(report.purchase_count, 0);
        assert!(close(report.average_purchase, 0.0));
    }

    #[test]
    fn test_yearly_report() {
        let mut f = fixture();
        f.purchases.push(purchase("p6", "v1", "i3", 1, 2.0, at(1, 5)));
        let mut yearly_input = input(&f, Language::En);
        yearly_input.period = ReportPeriod::year(2024).unwrap();
        let report = yearly(&yearly_input, at(12, 31));

        let months: Vec<&str> = report.by_month.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(months, vec!["January", "March"]);
        assert!(close(report.total_amount, 63.0));
        assert!(close(report.monthly_average, 63.0 / 12.0));
    }

    #[test]
    fn test_category_report() {
        let f = fixture();
        let report = by_category(&input(&f, Language::En), at(4, 1));
        assert_eq!(report.categories.len(), 2);

        let dairy = &report.categories[0];
        assert_eq!(dairy.category, "Dairy");
        assert_eq!(dairy.purchase_count, 3);
        assert_eq!(dairy.items[0].name, "Milk");
        assert!(close(dairy.items[0].amount, 28.0));
        assert_eq!(dairy.items[0].count, 2);
    }

    #[test]
    fn test_vendor_report() {
        let f = fixture();
        let report = by_vendor(&input(&f, Language::En), at(4, 1));
        assert_eq!(report.vendors.len(), 2);
        let panda = &report.vendors[0];
        assert_eq!(panda.name, "Panda");
        assert_eq!(panda.contact_person, "Ali");
        assert_eq!(panda.purchase_count, 2);
        assert_eq!(panda.purchases[0].purchased_at, at(3, 10));
    }

    #[test]
    fn test_item_report_average_price() {
        let f = fixture();
        let report = by_item(&input(&f, Language::En), at(4, 1));
        let milk = report.items.iter().find(|i| i.name == "Milk").unwrap();
        assert_eq!(milk.total_quantity, 6);
        assert!(close(milk.total_amount, 28.0));
        assert!(close(milk.average_price, 28.0 / 6.0));
        assert_eq!(milk.purchase_count, 2);
    }

    #[test]
    fn test_build_dispatches() {
        let f = fixture();
        let report = build(ReportKind::Vendor, &input(&f, Language::En), at(4, 1));
        assert!(matches!(report, Report::Vendor(_)));
        assert_eq!(report.header().kind, ReportKind::Vendor);
    }
}
