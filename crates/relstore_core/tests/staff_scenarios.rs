mod common;

use common::{memory_repository, Department, Employee};
use relstore_core::{Criteria, EntityRepository};

#[test]
fn department_employee_is_stored_and_salary_updated() {
    let repo = memory_repository();
    let mut hr = Department::new("HR");
    repo.save_or_update(&mut hr).unwrap();

    let mut jack = Employee::new("Jack", "Jarvis", 25_000);
    jack.department_id = hr.id;
    repo.save_or_update(&mut jack).unwrap();

    jack.salary = 70_000;
    repo.save_or_update(&mut jack).unwrap();

    let stored = repo
        .find_by_id::<Employee>(jack.id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.salary, 70_000);
    assert_eq!(stored.department_id, hr.id);

    let hr = repo.find_by_id::<Department>(hr.id.unwrap()).unwrap().unwrap();
    assert_eq!(hr.employees, vec![jack.id.unwrap()]);
}

#[test]
fn deleted_employee_disappears_from_lookups() {
    let repo = memory_repository();
    let mut al = Employee::new("Al", "Bundy", 35_000);
    let mut peggy = Employee::new("Peggy", "Bundy", 50_000);
    repo.save_or_update(&mut al).unwrap();
    repo.save_or_update(&mut peggy).unwrap();

    assert!(repo.delete(&al).unwrap());

    assert!(repo.find_by_id::<Employee>(al.id.unwrap()).unwrap().is_none());
    let remaining = repo.find_all::<Employee>().unwrap();
    assert_eq!(remaining, vec![peggy]);
    assert!(repo
        .unique_by::<Employee>(&Criteria::new().eq("first_name", "Al".to_string()))
        .unwrap()
        .is_none());
}

