//! Staff entities used by the demo run.

use log::info;
use relstore_core::{
    AssociationDescriptor, AssociationKind, Column, Entity, EntityDescriptor, EntityId,
    EntityRepository, Record, RepoResult,
};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS managers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    salary INTEGER NOT NULL,
    budget INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS departments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS employees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    salary INTEGER NOT NULL,
    department_id INTEGER REFERENCES departments(id),
    manager_id INTEGER REFERENCES managers(id)
);
";

static DEPARTMENTS: EntityDescriptor = EntityDescriptor {
    mapping: "departments",
    identity: "id",
    columns: &[Column::required("title")],
    shared: None,
    associations: &[AssociationDescriptor {
        name: "employees",
        kind: AssociationKind::OneToMany {
            foreign_key: "department_id",
        },
        related: Employee::descriptor,
    }],
};

static EMPLOYEES: EntityDescriptor = EntityDescriptor {
    mapping: "employees",
    identity: "id",
    columns: &[
        Column::required("first_name"),
        Column::required("last_name"),
        Column::required("salary"),
        Column::optional("department_id"),
        Column::optional("manager_id"),
    ],
    shared: None,
    associations: &[
        AssociationDescriptor {
            name: "department",
            kind: AssociationKind::ManyToOne {
                foreign_key: "department_id",
            },
            related: Department::descriptor,
        },
        AssociationDescriptor {
            name: "manager",
            kind: AssociationKind::ManyToOne {
                foreign_key: "manager_id",
            },
            related: Manager::descriptor,
        },
    ],
};

static MANAGERS: EntityDescriptor = EntityDescriptor {
    mapping: "managers",
    identity: "id",
    columns: &[
        Column::required("first_name"),
        Column::required("last_name"),
        Column::required("salary"),
        Column::required("budget"),
    ],
    shared: None,
    associations: &[AssociationDescriptor {
        name: "employees",
        kind: AssociationKind::OneToMany {
            foreign_key: "manager_id",
        },
        related: Employee::descriptor,
    }],
};

#[derive(Debug, Clone)]
pub struct Department {
    pub id: Option<EntityId>,
    pub title: String,
    pub employees: Vec<EntityId>,
}

impl Department {
    pub fn new(title: &str) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            employees: Vec::new(),
        }
    }
}

impl Entity for Department {
    fn descriptor() -> &'static EntityDescriptor {
        &DEPARTMENTS
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn to_record(&self) -> Record {
        Record::new(self.id)
            .with("title", self.title.clone())
            .with_collection("employees", &self.employees)
    }

    fn from_record(record: &Record) -> RepoResult<Self> {
        Ok(Self {
            id: record.id(),
            title: record.text("title")?,
            employees: record.collection("employees"),
        })
    }

    fn collection_mut(&mut self, association: &str) -> Option<&mut Vec<EntityId>> {
        (association == "employees").then_some(&mut self.employees)
    }
}

#[derive(Debug, Clone)]
pub struct Employee {
    pub id: Option<EntityId>,
    pub first_name: String,
    pub last_name: String,
    pub salary: i64,
    pub department_id: Option<EntityId>,
    pub manager_id: Option<EntityId>,
}

impl Employee {
    pub fn new(first_name: &str, last_name: &str, salary: i64) -> Self {
        Self {
            id: None,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            salary,
            department_id: None,
            manager_id: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for Employee {
    fn descriptor() -> &'static EntityDescriptor {
        &EMPLOYEES
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn to_record(&self) -> Record {
        Record::new(self.id)
            .with("first_name", self.first_name.clone())
            .with("last_name", self.last_name.clone())
            .with("salary", self.salary)
            .with("department_id", self.department_id)
            .with("manager_id", self.manager_id)
    }

    fn from_record(record: &Record) -> RepoResult<Self> {
        Ok(Self {
            id: record.id(),
            first_name: record.text("first_name")?,
            last_name: record.text("last_name")?,
            salary: record.integer("salary")?,
            department_id: record.optional_integer("department_id")?,
            manager_id: record.optional_integer("manager_id")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Manager {
    pub id: Option<EntityId>,
    pub first_name: String,
    pub last_name: String,
    pub salary: i64,
    pub budget: i64,
    pub employees: Vec<EntityId>,
}

impl Manager {
    pub fn new(first_name: &str, last_name: &str, salary: i64, budget: i64) -> Self {
        Self {
            id: None,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            salary,
            budget,
            employees: Vec::new(),
        }
    }

    /// Raises every employee reporting to this manager by a tenth and
    /// charges the total to the budget.
    ///
    /// Employees are read from storage, so members deleted since this
    /// manager was loaded are skipped. Returns the total raise.
    ///
    /// # Errors
    /// - Any repository error; the in-memory budget is restored when the
    ///   manager save fails.
    pub fn give_raise<R: EntityRepository>(&mut self, repo: &R) -> RepoResult<i64> {
        let mut total = 0;
        for mut employee in repo.query_by_association::<Employee, Manager>("manager", &*self)? {
            let raise = employee.salary / 10;
            employee.salary += raise;
            repo.save_or_update(&mut employee)?;
            total += raise;
        }

        self.budget -= total;
        if let Err(err) = repo.save_or_update(self) {
            self.budget += total;
            return Err(err);
        }
        info!(
            "event=manager_raise module=staff status=ok manager_id={:?} total={} budget={}",
            self.id, total, self.budget
        );
        Ok(total)
    }
}

impl Entity for Manager {
    fn descriptor() -> &'static EntityDescriptor {
        &MANAGERS
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn to_record(&self) -> Record {
        Record::new(self.id)
            .with("first_name", self.first_name.clone())
            .with("last_name", self.last_name.clone())
            .with("salary", self.salary)
            .with("budget", self.budget)
            .with_collection("employees", &self.employees)
    }

    fn from_record(record: &Record) -> RepoResult<Self> {
        Ok(Self {
            id: record.id(),
            first_name: record.text("first_name")?,
            last_name: record.text("last_name")?,
            salary: record.integer("salary")?,
            budget: record.integer("budget")?,
            employees: record.collection("employees"),
        })
    }

    fn collection_mut(&mut self, association: &str) -> Option<&mut Vec<EntityId>> {
        (association == "employees").then_some(&mut self.employees)
    }
}
