use bigp_gp::kernels::BilateralKernel;
use bigp_gp::metrics::MemorySink;
use bigp_gp::{DataSplit, Device, ExactGp, Standardizer, Trainer};
use ndarray::{arr2, concatenate, Array, Array1, Array2, Axis};

fn xsinx(x: &Array2<f64>) -> Array1<f64> {
    ((x - 3.5) * ((x - 3.5) / std::f64::consts::PI).mapv(|v| v.sin())).remove_axis(Axis(1))
}

fn main() {
    let xt = arr2(&[[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]]);
    let yt = xsinx(&xt);
    let xtest = Array::linspace(0., 25., 26).insert_axis(Axis(1));
    let ytest = xsinx(&xtest);

    let train = DataSplit::new(xt, yt, Device::Cpu).expect("training data");
    let test = DataSplit::new(xtest.clone(), ytest.clone(), Device::Cpu).expect("test data");
    let std = Standardizer::fit_split(&train).expect("standardization");
    let train = std.transform(&train).expect("standardized training data");
    let test = std.transform(&test).expect("standardized test data");

    println!("Train bilateral GP of 'xsinx' at {}", train.x().column(0));
    let mut gp = ExactGp::params(BilateralKernel::new())
        .build(train)
        .expect("GP building");
    let history = Trainer::new(200, 0.1)
        .log_every(50)
        .fit(&mut gp, &test, MemorySink::new())
        .expect("GP training");
    println!("{gp}");
    println!("Final test rmse (standardized) = {:?}", history.final_rmse());

    let (mean, var) = gp.predict(test.x()).expect("GP prediction");
    let ypred = std.inverse_transform_y(&mean);
    let ysigma = var.mapv(|v| v.sqrt() * std.y_std());

    println!("Compute prediction errors (x, err(x), sigma(x))");
    println!(
        "{}",
        concatenate![
            Axis(1),
            xtest,
            (ypred - ytest).insert_axis(Axis(1)),
            ysigma.insert_axis(Axis(1))
        ]
    );
}
