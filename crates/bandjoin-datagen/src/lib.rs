//! Seeded synthetic data for the two relation shapes.
//!
//! Employees spread uniformly over `A..E × 1..=departments`; Projects cover
//! only tag `A` but with `1/overlap_ratio` times as many department numbers,
//! so roughly `overlap_ratio` of the project departments also appear among
//! employees. All dates fall in 2023.

pub mod writer;

use bandjoin_error::{BandJoinError, Result};
use bandjoin_types::{CalendarDate, Value};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::info;

pub use writer::{GeneratedPair, generate_databases, write_employees, write_projects};

const DEPARTMENT_TAGS: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Knobs for one generated database pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub num_employees: u64,
    /// Expected share of project departments that also hold employees.
    pub overlap_ratio: f64,
    /// Department numbers per tag on the Employees side.
    pub num_departments: u32,
    pub avg_projects_per_department: f64,
    pub std_projects_per_department: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_employees: 60_000,
            overlap_ratio: 0.25,
            num_departments: 100,
            avg_projects_per_department: 50.0,
            std_projects_per_department: 10.0,
            seed: 42,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.overlap_ratio > 0.0 && self.overlap_ratio <= 1.0) {
            return Err(BandJoinError::Config(format!(
                "overlap_ratio {} must be in (0, 1]",
                self.overlap_ratio
            )));
        }
        if self.num_departments == 0 {
            return Err(BandJoinError::Config(
                "num_departments must be at least 1".to_owned(),
            ));
        }
        if self.avg_projects_per_department < 0.0 {
            return Err(BandJoinError::Config(
                "avg_projects_per_department must be non-negative".to_owned(),
            ));
        }
        self.project_count_distribution().map(|_| ())
    }

    /// `Normal(avg, std)` for the number of projects in one department.
    pub fn project_count_distribution(&self) -> Result<Normal<f64>> {
        Normal::new(
            self.avg_projects_per_department,
            self.std_projects_per_department,
        )
        .map_err(|e| {
            BandJoinError::Config(format!(
                "std_projects_per_department {}: {e}",
                self.std_projects_per_department
            ))
        })
    }

    /// Department labels on the Projects side: `A_1 .. A_{(1/overlap)·n - 1}`.
    #[must_use]
    pub fn project_departments(&self) -> Vec<String> {
        let upper = (1.0 / self.overlap_ratio) as u64 * u64::from(self.num_departments);
        (1..upper).map(|n| format!("A_{n}")).collect()
    }

    /// Department labels on the Employees side.
    #[must_use]
    pub fn employee_departments(&self) -> Vec<String> {
        DEPARTMENT_TAGS
            .iter()
            .flat_map(|tag| (1..=self.num_departments).map(move |n| format!("{tag}_{n}")))
            .collect()
    }

    #[must_use]
    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.seed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeRecord {
    pub id: i64,
    pub department: String,
    pub name: String,
    pub hire_date: CalendarDate,
}

impl EmployeeRecord {
    /// `EmployeeID, Department, Name, HireDate`.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        vec![
            Value::Integer(self.id),
            Value::Text(self.department),
            Value::Text(self.name),
            Value::Text(self.hire_date.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub id: i64,
    pub department: String,
    pub start_date: CalendarDate,
    pub funding: i64,
}

impl ProjectRecord {
    /// `ProjectID, Department, StartDate, Funding`.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        vec![
            Value::Integer(self.id),
            Value::Text(self.department),
            Value::Text(self.start_date.to_string()),
            Value::Integer(self.funding),
        ]
    }
}

fn date_in_2023(rng: &mut impl Rng) -> CalendarDate {
    let jan_first = CalendarDate::from_days(19_358);
    jan_first.add_days(rng.gen_range(0..=364))
}

/// Employees with ids `1..=num_employees`, named `Employee_{id}`.
pub fn generate_employees(
    config: &GeneratorConfig,
    rng: &mut impl Rng,
) -> Result<Vec<EmployeeRecord>> {
    config.validate()?;
    let departments = config.employee_departments();
    let employees: Vec<EmployeeRecord> = (1..=config.num_employees)
        .map(|id| EmployeeRecord {
            id: id as i64,
            department: departments[rng.gen_range(0..departments.len())].clone(),
            name: format!("Employee_{id}"),
            hire_date: date_in_2023(rng),
        })
        .collect();
    info!(rows = employees.len(), "employees generated");
    Ok(employees)
}

/// Projects grouped by department, with unique ids drawn without
/// replacement from `1..len(departments)·(avg + 2·std)`.
pub fn generate_projects(
    config: &GeneratorConfig,
    rng: &mut impl Rng,
) -> Result<Vec<ProjectRecord>> {
    config.validate()?;
    let departments = config.project_departments();
    let id_bound = (departments.len() as f64
        * 2.0f64.mul_add(config.std_projects_per_department, config.avg_projects_per_department))
        as i64;
    let mut id_pool: Vec<i64> = (1..id_bound.max(1)).collect();
    let project_counts = config.project_count_distribution()?;

    let mut projects = Vec::new();
    for department in &departments {
        let count = (project_counts.sample(rng).trunc() as i64).max(1);
        for _ in 0..count {
            let start_date = date_in_2023(rng);
            let funding = rng.gen_range(10..=1000_i64) * 1000;
            if id_pool.is_empty() {
                return Err(BandJoinError::Config(format!(
                    "project id pool of {} exhausted at department {department}",
                    id_bound.max(1) - 1
                )));
            }
            let id = id_pool.swap_remove(rng.gen_range(0..id_pool.len()));
            projects.push(ProjectRecord {
                id,
                department: department.clone(),
                start_date,
                funding,
            });
        }
    }
    info!(
        rows = projects.len(),
        departments = departments.len(),
        "projects generated"
    );
    Ok(projects)
}
