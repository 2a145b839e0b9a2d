#![allow(dead_code)]

use relstore_core::{
    AssociationDescriptor, AssociationKind, Column, Entity, EntityDescriptor, EntityId,
    Record, RepoResult, SessionFactory, SharedMapping, SqliteEntityRepository,
    StoreConfig,
};

pub const SCHEMA: &str = "
CREATE TABLE managers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    salary INTEGER NOT NULL,
    budget INTEGER NOT NULL
);
CREATE TABLE departments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    manager_id INTEGER REFERENCES managers(id)
);
CREATE TABLE employees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    salary INTEGER NOT NULL,
    department_id INTEGER REFERENCES departments(id),
    manager_id INTEGER REFERENCES managers(id)
);
CREATE TABLE courses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    level TEXT NOT NULL
);
CREATE TABLE instructors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);
CREATE TABLE course_instructors (
    course_id INTEGER NOT NULL REFERENCES courses(id),
    instructor_id INTEGER NOT NULL REFERENCES instructors(id)
);
CREATE TABLE lessons (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    classroom INTEGER NOT NULL,
    course_id INTEGER REFERENCES courses(id)
);
CREATE TABLE students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    age INTEGER NOT NULL
);
CREATE TABLE lesson_students (
    lesson_id INTEGER NOT NULL REFERENCES lessons(id),
    student_id INTEGER NOT NULL REFERENCES students(id)
);
CREATE TABLE stock_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    buy_price INTEGER NOT NULL,
    sell_price INTEGER NOT NULL
);
CREATE TABLE books (
    id INTEGER PRIMARY KEY REFERENCES stock_items(id),
    title TEXT NOT NULL
);
CREATE TABLE stands (
    id INTEGER PRIMARY KEY REFERENCES stock_items(id),
    colour TEXT NOT NULL
);
CREATE TABLE ledger_entries (
    id INTEGER,
    note TEXT NOT NULL
);
";

pub fn memory_repository() -> SqliteEntityRepository {
    repository_for(StoreConfig::in_memory())
}

pub fn repository_for(config: StoreConfig) -> SqliteEntityRepository {
    let factory = SessionFactory::new(config);
    factory.apply_schema(SCHEMA).unwrap();
    SqliteEntityRepository::new(factory)
}

pub fn count_rows(repo: &SqliteEntityRepository, table: &str) -> i64 {
    let session = repo.factory().open_session().unwrap();
    session
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
            row.get(0)
        })
        .unwrap()
}

// ---- staff ----

pub static MANAGERS: EntityDescriptor = EntityDescriptor {
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

pub static DEPARTMENTS: EntityDescriptor = EntityDescriptor {
    mapping: "departments",
    identity: "id",
    columns: &[Column::required("title"), Column::optional("manager_id")],
    shared: None,
    associations: &[
        AssociationDescriptor {
            name: "employees",
            kind: AssociationKind::OneToMany {
                foreign_key: "department_id",
            },
            related: Employee::descriptor,
        },
        AssociationDescriptor {
            name: "manager",
            kind: AssociationKind::OneToOne {
                foreign_key: "manager_id",
            },
            related: Manager::descriptor,
        },
    ],
};

pub static EMPLOYEES: EntityDescriptor = EntityDescriptor {
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

#[derive(Debug, Clone, PartialEq)]
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
        match association {
            "employees" => Some(&mut self.employees),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Department {
    pub id: Option<EntityId>,
    pub title: String,
    pub manager_id: Option<EntityId>,
    pub employees: Vec<EntityId>,
}

impl Department {
    pub fn new(title: &str) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            manager_id: None,
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
            .with("manager_id", self.manager_id)
            .with_collection("employees", &self.employees)
    }

    fn from_record(record: &Record) -> RepoResult<Self> {
        Ok(Self {
            id: record.id(),
            title: record.text("title")?,
            manager_id: record.optional_integer("manager_id")?,
            employees: record.collection("employees"),
        })
    }

    fn collection_mut(&mut self, association: &str) -> Option<&mut Vec<EntityId>> {
        match association {
            "employees" => Some(&mut self.employees),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
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

/// Raises every managed employee by 10% and charges the manager's budget.
///
/// Each save is its own unit of work. Members deleted since loading are
/// dropped from the manager.
// ---- school ----

pub static COURSES: EntityDescriptor = EntityDescriptor {
    mapping: "courses",
    identity: "id",
    columns: &[Column::required("title"), Column::required("level")],
    shared: None,
    associations: &[
        AssociationDescriptor {
            name: "instructors",
            kind: AssociationKind::ManyToMany {
                join_table: "course_instructors",
                owner_column: "course_id",
                related_column: "instructor_id",
            },
            related: Instructor::descriptor,
        },
        AssociationDescriptor {
            name: "lessons",
            kind: AssociationKind::OneToMany {
                foreign_key: "course_id",
            },
            related: Lesson::descriptor,
        },
    ],
};

pub static INSTRUCTORS: EntityDescriptor = EntityDescriptor {
    mapping: "instructors",
    identity: "id",
    columns: &[Column::required("name")],
    shared: None,
    associations: &[AssociationDescriptor {
        name: "courses",
        kind: AssociationKind::ManyToMany {
            join_table: "course_instructors",
            owner_column: "instructor_id",
            related_column: "course_id",
        },
        related: Course::descriptor,
    }],
};

pub static LESSONS: EntityDescriptor = EntityDescriptor {
    mapping: "lessons",
    identity: "id",
    columns: &[
        Column::required("title"),
        Column::required("classroom"),
        Column::optional("course_id"),
    ],
    shared: None,
    associations: &[
        AssociationDescriptor {
            name: "course",
            kind: AssociationKind::ManyToOne {
                foreign_key: "course_id",
            },
            related: Course::descriptor,
        },
        AssociationDescriptor {
            name: "students",
            kind: AssociationKind::ManyToMany {
                join_table: "lesson_students",
                owner_column: "lesson_id",
                related_column: "student_id",
            },
            related: Student::descriptor,
        },
    ],
};

pub static STUDENTS: EntityDescriptor = EntityDescriptor {
    mapping: "students",
    identity: "id",
    columns: &[Column::required("name"), Column::required("age")],
    shared: None,
    associations: &[AssociationDescriptor {
        name: "lessons",
        kind: AssociationKind::ManyToMany {
            join_table: "lesson_students",
            owner_column: "student_id",
            related_column: "lesson_id",
        },
        related: Lesson::descriptor,
    }],
};

#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: Option<EntityId>,
    pub title: String,
    pub level: String,
    pub instructors: Vec<EntityId>,
    pub lessons: Vec<EntityId>,
}

impl Course {
    pub fn new(title: &str, level: &str) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            level: level.to_string(),
            instructors: Vec::new(),
            lessons: Vec::new(),
        }
    }
}

impl Entity for Course {
    fn descriptor() -> &'static EntityDescriptor {
        &COURSES
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
            .with("level", self.level.clone())
            .with_collection("instructors", &self.instructors)
            .with_collection("lessons", &self.lessons)
    }

    fn from_record(record: &Record) -> RepoResult<Self> {
        Ok(Self {
            id: record.id(),
            title: record.text("title")?,
            level: record.text("level")?,
            instructors: record.collection("instructors"),
            lessons: record.collection("lessons"),
        })
    }

    fn collection_mut(&mut self, association: &str) -> Option<&mut Vec<EntityId>> {
        match association {
            "instructors" => Some(&mut self.instructors),
            "lessons" => Some(&mut self.lessons),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instructor {
    pub id: Option<EntityId>,
    pub name: String,
    pub courses: Vec<EntityId>,
}

impl Instructor {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            courses: Vec::new(),
        }
    }
}

impl Entity for Instructor {
    fn descriptor() -> &'static EntityDescriptor {
        &INSTRUCTORS
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn to_record(&self) -> Record {
        Record::new(self.id)
            .with("name", self.name.clone())
            .with_collection("courses", &self.courses)
    }

    fn from_record(record: &Record) -> RepoResult<Self> {
        Ok(Self {
            id: record.id(),
            name: record.text("name")?,
            courses: record.collection("courses"),
        })
    }

    fn collection_mut(&mut self, association: &str) -> Option<&mut Vec<EntityId>> {
        match association {
            "courses" => Some(&mut self.courses),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    pub id: Option<EntityId>,
    pub title: String,
    pub classroom: i64,
    pub course_id: Option<EntityId>,
    pub students: Vec<EntityId>,
}

impl Lesson {
    pub fn new(title: &str, classroom: i64, course_id: Option<EntityId>) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            classroom,
            course_id,
            students: Vec::new(),
        }
    }
}

impl Entity for Lesson {
    fn descriptor() -> &'static EntityDescriptor {
        &LESSONS
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
            .with("classroom", self.classroom)
            .with("course_id", self.course_id)
            .with_collection("students", &self.students)
    }

    fn from_record(record: &Record) -> RepoResult<Self> {
        Ok(Self {
            id: record.id(),
            title: record.text("title")?,
            classroom: record.integer("classroom")?,
            course_id: record.optional_integer("course_id")?,
            students: record.collection("students"),
        })
    }

    fn collection_mut(&mut self, association: &str) -> Option<&mut Vec<EntityId>> {
        match association {
            "students" => Some(&mut self.students),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: Option<EntityId>,
    pub name: String,
    pub age: i64,
    pub lessons: Vec<EntityId>,
}

impl Student {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            age,
            lessons: Vec::new(),
        }
    }
}

impl Entity for Student {
    fn descriptor() -> &'static EntityDescriptor {
        &STUDENTS
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn to_record(&self) -> Record {
        Record::new(self.id)
            .with("name", self.name.clone())
            .with("age", self.age)
            .with_collection("lessons", &self.lessons)
    }

    fn from_record(record: &Record) -> RepoResult<Self> {
        Ok(Self {
            id: record.id(),
            name: record.text("name")?,
            age: record.integer("age")?,
            lessons: record.collection("lessons"),
        })
    }

    fn collection_mut(&mut self, association: &str) -> Option<&mut Vec<EntityId>> {
        match association {
            "lessons" => Some(&mut self.lessons),
            _ => None,
        }
    }
}

// ---- shop: concrete items embedding a shared pricing fragment ----

pub static STOCK_ITEMS: SharedMapping = SharedMapping {
    mapping: "stock_items",
    identity: "id",
    columns: &[Column::required("buy_price"), Column::required("sell_price")],
};

pub static BOOKS: EntityDescriptor = EntityDescriptor {
    mapping: "books",
    identity: "id",
    columns: &[Column::required("title")],
    shared: Some(&STOCK_ITEMS),
    associations: &[],
};

pub static STANDS: EntityDescriptor = EntityDescriptor {
    mapping: "stands",
    identity: "id",
    columns: &[Column::required("colour")],
    shared: Some(&STOCK_ITEMS),
    associations: &[],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pricing {
    pub buy_price: i64,
    pub sell_price: i64,
}

impl Pricing {
    pub fn markup(&self) -> i64 {
        self.sell_price - self.buy_price
    }

    fn write(&self, record: Record) -> Record {
        record
            .with("buy_price", self.buy_price)
            .with("sell_price", self.sell_price)
    }

    fn read(record: &Record) -> RepoResult<Self> {
        Ok(Self {
            buy_price: record.integer("buy_price")?,
            sell_price: record.integer("sell_price")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MusicBook {
    pub id: Option<EntityId>,
    pub pricing: Pricing,
    pub title: String,
}

impl Entity for MusicBook {
    fn descriptor() -> &'static EntityDescriptor {
        &BOOKS
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn to_record(&self) -> Record {
        self.pricing
            .write(Record::new(self.id))
            .with("title", self.title.clone())
    }

    fn from_record(record: &Record) -> RepoResult<Self> {
        Ok(Self {
            id: record.id(),
            pricing: Pricing::read(record)?,
            title: record.text("title")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MusicStand {
    pub id: Option<EntityId>,
    pub pricing: Pricing,
    pub colour: String,
}

impl Entity for MusicStand {
    fn descriptor() -> &'static EntityDescriptor {
        &STANDS
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn to_record(&self) -> Record {
        self.pricing
            .write(Record::new(self.id))
            .with("colour", self.colour.clone())
    }

    fn from_record(record: &Record) -> RepoResult<Self> {
        Ok(Self {
            id: record.id(),
            pricing: Pricing::read(record)?,
            colour: record.text("colour")?,
        })
    }
}

// ---- ledger: table without a primary key, used for integrity checks ----

pub static LEDGER_ENTRIES: EntityDescriptor = EntityDescriptor {
    mapping: "ledger_entries",
    identity: "id",
    columns: &[Column::required("note")],
    shared: None,
    associations: &[],
};

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub id: Option<EntityId>,
    pub note: String,
}

impl Entity for LedgerEntry {
    fn descriptor() -> &'static EntityDescriptor {
        &LEDGER_ENTRIES
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn to_record(&self) -> Record {
        Record::new(self.id).with("note", self.note.clone())
    }

    fn from_record(record: &Record) -> RepoResult<Self> {
        Ok(Self {
            id: record.id(),
            note: record.text("note")?,
        })
    }
}
