//! Scripted in-memory data source for navigator and reconciliation tests
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use regstat::application::services::{NavigatorService, ReconciliationService};
use regstat::domain::{
    BasicStats, DistrictDetail, EnhancedDetail, HouseholdStats, RegionSummary, YearRecord,
};
use regstat::infrastructure::{RegionSource, SourceError, SourceResult};

type Reply = Option<Vec<RegionSummary>>;

/// Queue of scripted list replies; the last reply repeats.
#[derive(Default)]
struct Replies(VecDeque<Reply>);

impl Replies {
    fn next(&mut self) -> Reply {
        if self.0.len() > 1 {
            self.0.pop_front().flatten()
        } else {
            self.0.front().cloned().flatten()
        }
    }
}

#[derive(Default)]
pub struct FakeSource {
    lists: Mutex<HashMap<String, Replies>>,
    records: Mutex<HashMap<(String, i32), YearRecord>>,
    enhanced: Mutex<HashMap<String, EnhancedDetail>>,
    timeseries: Mutex<HashMap<String, BTreeMap<i32, YearRecord>>>,
    district_details: Mutex<HashMap<String, DistrictDetail>>,
    years: Mutex<Vec<i32>>,
    failing: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
}

pub const ROOT: &str = "root";

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the children of `parent` (`ROOT` for provinces); `None` fails the call.
    pub fn script(&self, parent: &str, replies: Vec<Reply>) {
        self.lists
            .lock()
            .unwrap()
            .insert(parent.to_string(), Replies(replies.into()));
    }

    pub fn children(&self, parent: &str, children: &[(&str, &str)]) {
        self.script(parent, vec![Some(regions(children))]);
    }

    /// Hold list calls for `parent` until the returned gate is notified.
    pub fn gate(&self, parent: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(parent.to_string(), notify.clone());
        notify
    }

    /// Fail every call whose log key equals `key`, e.g. `get_enhanced_detail:S`.
    pub fn fail(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub fn set_record(&self, code: &str, year: i32, record: YearRecord) {
        self.records
            .lock()
            .unwrap()
            .insert((code.to_string(), year), record);
    }

    pub fn set_enhanced(&self, code: &str, detail: EnhancedDetail) {
        self.enhanced
            .lock()
            .unwrap()
            .insert(code.to_string(), detail);
    }

    pub fn set_timeseries(&self, code: &str, records: BTreeMap<i32, YearRecord>) {
        self.timeseries
            .lock()
            .unwrap()
            .insert(code.to_string(), records);
    }

    pub fn set_district_detail(&self, code: &str, detail: DistrictDetail) {
        self.district_details
            .lock()
            .unwrap()
            .insert(code.to_string(), detail);
    }

    pub fn set_years(&self, years: &[i32]) {
        *self.years.lock().unwrap() = years.to_vec();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, key: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == key).count()
    }

    fn record_call(&self, key: &str) -> SourceResult<()> {
        self.calls.lock().unwrap().push(key.to_string());
        if self.failing.lock().unwrap().contains(key) {
            return Err(SourceError::Status {
                status: 500,
                url: key.to_string(),
            });
        }
        Ok(())
    }

    async fn list(&self, op: &str, parent: &str) -> SourceResult<Vec<RegionSummary>> {
        let key = format!("{op}:{parent}");
        self.record_call(&key)?;
        let gate = self.gates.lock().unwrap().get(parent).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let reply = self
            .lists
            .lock()
            .unwrap()
            .get_mut(parent)
            .map(Replies::next)
            .unwrap_or_else(|| Some(Vec::new()));
        reply.ok_or(SourceError::Status {
            status: 503,
            url: key,
        })
    }
}

#[async_trait]
impl RegionSource for FakeSource {
    async fn list_provinces(&self) -> SourceResult<Vec<RegionSummary>> {
        self.list("list_provinces", ROOT).await
    }

    async fn list_districts(&self, province_code: &str) -> SourceResult<Vec<RegionSummary>> {
        self.list("list_districts", province_code).await
    }

    async fn list_subdistricts(&self, district_code: &str) -> SourceResult<Vec<RegionSummary>> {
        self.list("list_subdistricts", district_code).await
    }

    async fn get_year_record(&self, subdistrict_code: &str, year: i32) -> SourceResult<YearRecord> {
        self.record_call(&format!("get_year_record:{subdistrict_code}"))?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(subdistrict_code.to_string(), year))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_enhanced_detail(&self, subdistrict_code: &str) -> SourceResult<EnhancedDetail> {
        self.record_call(&format!("get_enhanced_detail:{subdistrict_code}"))?;
        Ok(self
            .enhanced
            .lock()
            .unwrap()
            .get(subdistrict_code)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_years(&self) -> SourceResult<Vec<i32>> {
        self.record_call("list_years")?;
        Ok(self.years.lock().unwrap().clone())
    }

    async fn get_timeseries(
        &self,
        subdistrict_code: &str,
    ) -> SourceResult<BTreeMap<i32, YearRecord>> {
        self.record_call(&format!("get_timeseries:{subdistrict_code}"))?;
        Ok(self
            .timeseries
            .lock()
            .unwrap()
            .get(subdistrict_code)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_district_detail(&self, district_code: &str) -> SourceResult<DistrictDetail> {
        self.record_call(&format!("get_district_detail:{district_code}"))?;
        Ok(self
            .district_details
            .lock()
            .unwrap()
            .get(district_code)
            .cloned()
            .unwrap_or_else(|| DistrictDetail {
                code: district_code.to_string(),
                ..Default::default()
            }))
    }
}

pub fn regions(items: &[(&str, &str)]) -> Vec<RegionSummary> {
    items
        .iter()
        .map(|(code, name)| RegionSummary::new(*code, *name))
        .collect()
}

pub fn navigator(source: Arc<FakeSource>) -> NavigatorService {
    let source: Arc<dyn RegionSource> = source;
    NavigatorService::new(
        source.clone(),
        ReconciliationService::new(source, None),
        Duration::from_millis(5),
    )
}

pub fn basic(total: u64) -> BasicStats {
    BasicStats {
        total_population: Some(total),
        ..Default::default()
    }
}

pub fn household(members: Option<u64>, households: Option<u64>, avg: Option<f64>) -> HouseholdStats {
    HouseholdStats {
        household_count: households,
        family_member_count: members,
        avg_family_member_count: avg,
    }
}

/// Province 11 (Seoul) with district 11010 containing sub-district 1101053, plus province 26.
pub fn seoul_fixture() -> Arc<FakeSource> {
    let fake = FakeSource::new();
    fake.children(ROOT, &[("11", "Seoul"), ("26", "Busan")]);
    fake.children("11", &[("11010", "Jongno-gu"), ("11020", "Jung-gu")]);
    fake.children("26", &[("26010", "Jung-gu"), ("26260", "Haeundae-gu")]);
    fake.children("11010", &[("1101053", "Sajik-dong"), ("1101054", "Samcheong-dong")]);
    fake
}
